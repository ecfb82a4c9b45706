//! Consultation reports: PDF through `printpdf`, CSV written by hand.

use std::borrow::Cow;
use std::io::BufWriter;

use chrono::NaiveDate;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::models::enums::{ReportFormat, StrEnum};
use crate::models::Consultation;

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const LEFT: f32 = 20.0;
const LINE_HEIGHT: f32 = 6.0;
const WRAP_WIDTH: usize = 95;

const CSV_HEADER: &[&str] = &[
    "id",
    "consultation_date",
    "patient",
    "doctor",
    "status",
    "cost",
    "doctor_remarks",
];

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("PDF font error: {0}")]
    Font(String),
    #[error("PDF write error: {0}")]
    Write(String),
}

/// A rendered export ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct Report {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Report over the consultations of a date range.
pub fn consultation_report(
    consultations: &[Consultation],
    start: NaiveDate,
    end: NaiveDate,
    format: ReportFormat,
) -> Result<Report, ReportError> {
    let bytes = match format {
        ReportFormat::Pdf => range_pdf(consultations, start, end)?,
        ReportFormat::Csv => consultations_csv(consultations).into_bytes(),
    };
    Ok(Report {
        filename: format!("report-{start}-to-{end}.{}", format.extension()),
        content_type: format.content_type(),
        bytes,
    })
}

fn range_pdf(
    consultations: &[Consultation],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<u8>, ReportError> {
    let mut lines: Vec<String> = consultations
        .iter()
        .map(|c| {
            format!(
                "{} - {} - Dr {} - {} - {:.2}",
                c.consultation_date.format("%Y-%m-%d %H:%M"),
                patient_name(c, " "),
                doctor_name(c),
                c.status,
                c.cost
            )
        })
        .collect();
    let total: f64 = consultations.iter().map(|c| c.cost).sum();
    lines.push(String::new());
    lines.push(format!(
        "Total: {} consultation(s), {:.2}",
        consultations.len(),
        total
    ));

    render_pdf(
        "Consultation report",
        &format!("From {start} to {end}"),
        &lines,
    )
}

/// One line per consultation of a patient, as exported from the dashboard:
/// `<n>. <first>.<last> - <status> - <date>`.
pub fn patient_consultations_pdf(
    patient_id: i64,
    consultations: &[Consultation],
) -> Result<Vec<u8>, ReportError> {
    let lines: Vec<String> = consultations
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{}. {} - {} - {}",
                i + 1,
                patient_name(c, "."),
                c.status,
                c.consultation_date
            )
        })
        .collect();
    let title = format!("Consultation report for patient {patient_id}");
    render_pdf(&title, "", &lines)
}

fn patient_name(c: &Consultation, separator: &str) -> String {
    match &c.patient {
        Some(p) => format!("{}{separator}{}", p.first_name, p.last_name),
        None => format!("patient #{}", c.patient_id),
    }
}

fn doctor_name(c: &Consultation) -> String {
    match &c.doctor {
        Some(d) => d.full_name(),
        None => format!("#{}", c.doctor_id),
    }
}

struct PdfWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PdfWriter<'_> {
    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        if self.y < BOTTOM {
            let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
            self.pages += 1;
        }
        self.layer.use_text(text, size, Mm(LEFT), Mm(self.y), font);
        self.y -= LINE_HEIGHT;
    }
}

/// Title, optional subtitle, then body lines. Starts a new A4 page when
/// the current one is full.
fn render_pdf(title: &str, subtitle: &str, lines: &[String]) -> Result<Vec<u8>, ReportError> {
    let (doc, page1, layer1) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Font(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Font(e.to_string()))?;

    let mut writer = PdfWriter {
        doc: &doc,
        layer: doc.get_page(page1).get_layer(layer1),
        font,
        y: TOP,
        pages: 1,
    };
    writer.line(title, 14.0, &bold);
    if !subtitle.is_empty() {
        writer.line(subtitle, 10.0, &bold);
    }
    writer.y -= LINE_HEIGHT;

    let font = writer.font.clone();
    for line in lines {
        for chunk in wrap_text(line, WRAP_WIDTH) {
            writer.line(&chunk, 10.0, &font);
        }
    }
    tracing::debug!(pages = writer.pages, lines = lines.len(), "PDF rendered");

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Write(e.to_string()))?;
    buf.into_inner()
        .map_err(|e| ReportError::Write(e.to_string()))
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if text.chars().count() <= width {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// CSV with a header row. Fields holding a comma, quote or line break are
/// quoted, with inner quotes doubled.
pub fn consultations_csv(consultations: &[Consultation]) -> String {
    let mut out = String::new();
    push_record(&mut out, CSV_HEADER.iter().map(|h| Cow::Borrowed(*h)));
    for c in consultations {
        let record = [
            Cow::Owned(c.id.to_string()),
            Cow::Owned(c.consultation_date.to_string()),
            Cow::Owned(patient_name(c, " ")),
            Cow::Owned(doctor_name(c)),
            Cow::Borrowed(c.status.as_str()),
            Cow::Owned(format!("{:.2}", c.cost)),
            Cow::Borrowed(c.doctor_remarks.as_str()),
        ];
        push_record(&mut out, record.into_iter());
    }
    out
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = Cow<'a, str>>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&csv_field(&field));
    }
    out.push_str("\r\n");
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::ConsultationStatus;
    use crate::models::{Patient, User};
    use crate::models::enums::Role;
    use chrono::NaiveDateTime;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn consultation(id: i64, remarks: &str) -> Consultation {
        let now = at("2025-01-01 00:00:00");
        Consultation {
            id,
            patient_id: 1,
            doctor_id: 2,
            appointment_id: None,
            consultation_date: at("2025-01-15 09:30:00"),
            doctor_remarks: remarks.into(),
            cost: 15000.0,
            status: ConsultationStatus::Billed,
            created_at: now,
            updated_at: now,
            patient: Some(Patient {
                id: 1,
                first_name: "Moussa".into(),
                last_name: "Kone".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1975, 6, 15).unwrap(),
                age: 49,
                phone: "0102030405".into(),
                address: "Bamako".into(),
                sex: "Homme".into(),
                email: None,
                created_at: now,
                updated_at: now,
                administrative_data: None,
                medical_data: None,
            }),
            doctor: Some(User {
                id: 2,
                first_name: "Awa".into(),
                last_name: "Diallo".into(),
                email: "awa@renalcare.test".into(),
                contact: None,
                role: Role::User,
                created_at: now,
                updated_at: now,
            }),
            appointment: None,
        }
    }

    #[test]
    fn csv_quotes_special_fields() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn csv_has_header_and_one_row_per_consultation() {
        let csv = consultations_csv(&[consultation(1, "RAS"), consultation(2, "Tension, stable")]);
        let rows: Vec<&str> = csv.split("\r\n").filter(|r| !r.is_empty()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "id,consultation_date,patient,doctor,status,cost,doctor_remarks");
        assert_eq!(
            rows[2],
            "2,2025-01-15 09:30:00,Moussa Kone,Awa Diallo,billed,15000.00,\"Tension, stable\""
        );
    }

    #[test]
    fn report_filename_and_type_follow_format() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let csv = consultation_report(&[], start, end, ReportFormat::Csv).unwrap();
        assert_eq!(csv.filename, "report-2025-01-01-to-2025-01-31.csv");
        assert!(csv.content_type.starts_with("text/csv"));

        let pdf = consultation_report(&[consultation(1, "RAS")], start, end, ReportFormat::Pdf).unwrap();
        assert_eq!(pdf.content_type, "application/pdf");
        assert!(pdf.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_reports_span_pages() {
        let many: Vec<Consultation> = (1..=120).map(|i| consultation(i, "RAS")).collect();
        let bytes = patient_consultations_pdf(1, &many).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn wrap_keeps_short_lines_whole() {
        assert_eq!(wrap_text("short", 10), vec!["short"]);
        assert_eq!(wrap_text("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
    }
}

//! Dashboard list helpers: case-insensitive search and fixed page sizes.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::models::enums::StrEnum;
use crate::models::*;
use crate::validation::FieldErrors;

pub const PAGE_SIZES: [usize; 5] = [2, 5, 10, 20, 50];
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Entity fields a dashboard search term is matched against.
pub trait Searchable {
    fn search_fields(&self) -> Vec<Cow<'_, str>>;

    /// Case-insensitive substring match on any field. Whitespace is part
    /// of the term; only the empty term matches everything.
    fn matches(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Query string accepted by every list endpoint. Values stay raw so bad
/// input becomes a field error rather than an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

/// Full collection, or one page of it when pagination was requested.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    All(Vec<T>),
    Page(Page<T>),
}

impl ListQuery {
    /// `None` when neither `page` nor `per_page` was given.
    pub fn pagination(&self) -> Result<Option<Pagination>, FieldErrors> {
        if self.page.is_none() && self.per_page.is_none() {
            return Ok(None);
        }
        let mut errors = FieldErrors::new();

        let page = match self.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some(raw) => match raw.parse::<usize>() {
                Ok(p) if p >= 1 => p,
                _ => {
                    errors.add("page", "The page must be a positive integer.");
                    1
                }
            },
        };
        let per_page = match self.per_page.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_PAGE_SIZE,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if PAGE_SIZES.contains(&n) => n,
                _ => {
                    let allowed: Vec<String> = PAGE_SIZES.iter().map(|n| n.to_string()).collect();
                    errors.add(
                        "per_page",
                        format!("The per page must be one of: {}.", allowed.join(", ")),
                    );
                    DEFAULT_PAGE_SIZE
                }
            },
        };

        errors.finish()?;
        Ok(Some(Pagination { page, per_page }))
    }

    /// Filter by `search`, then paginate when requested.
    pub fn apply<T: Searchable>(&self, items: Vec<T>) -> Result<Listing<T>, FieldErrors> {
        let pagination = self.pagination()?;
        let filtered = filter(items, self.search.as_deref());
        Ok(match pagination {
            None => Listing::All(filtered),
            Some(p) => Listing::Page(paginate(filtered, p)),
        })
    }
}

pub fn filter<T: Searchable>(items: Vec<T>, term: Option<&str>) -> Vec<T> {
    match term {
        None => items,
        Some(term) => items.into_iter().filter(|item| item.matches(term)).collect(),
    }
}

/// Slice out one page. Pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, pagination: Pagination) -> Page<T> {
    let Pagination { page, per_page } = pagination;
    let total = items.len();
    let total_pages = total.div_ceil(per_page);
    let start = (page - 1).saturating_mul(per_page);
    let items = items.into_iter().skip(start).take(per_page).collect();
    Page {
        items,
        total,
        page,
        per_page,
        total_pages,
    }
}

impl Searchable for Patient {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(self.first_name.as_str()),
            Cow::Borrowed(self.last_name.as_str()),
            Cow::Borrowed(self.address.as_str()),
        ]
    }
}

impl Searchable for User {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![
            Cow::Borrowed(self.first_name.as_str()),
            Cow::Borrowed(self.last_name.as_str()),
            Cow::Borrowed(self.email.as_str()),
        ];
        if let Some(contact) = &self.contact {
            fields.push(Cow::Borrowed(contact.as_str()));
        }
        fields
    }
}

impl Searchable for Consultation {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![Cow::Owned(self.consultation_date.to_string())];
        if let Some(doctor) = &self.doctor {
            fields.push(Cow::Borrowed(doctor.first_name.as_str()));
            fields.push(Cow::Borrowed(doctor.last_name.as_str()));
        }
        fields
    }
}

impl Searchable for Appointment {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![Cow::Borrowed(self.status.as_str())];
        if let Some(patient) = &self.patient {
            fields.push(Cow::Borrowed(patient.first_name.as_str()));
            fields.push(Cow::Borrowed(patient.last_name.as_str()));
        }
        if let Some(notes) = &self.notes {
            fields.push(Cow::Borrowed(notes.as_str()));
        }
        fields
    }
}

impl Searchable for AppointmentTask {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![
            Cow::Borrowed(self.task_type.as_str()),
            Cow::Borrowed(self.status.as_str()),
        ];
        if let Some(description) = &self.description {
            fields.push(Cow::Borrowed(description.as_str()));
        }
        fields
    }
}

impl Searchable for MrcProtocol {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(self.name.as_str())]
    }
}

impl Searchable for ProtocolAssignment {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        self.protocol.search_fields()
    }
}

impl Searchable for DialysisStep {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![
            Cow::Borrowed(self.step_type.as_str()),
            Cow::Borrowed(self.step_type.label()),
        ];
        if let Some(notes) = &self.notes {
            fields.push(Cow::Borrowed(notes.as_str()));
        }
        fields
    }
}

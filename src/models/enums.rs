use crate::db::DatabaseError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Closed set of string-backed values, used by request validation.
pub trait StrEnum: std::str::FromStr + Copy + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    /// Canonical values, for validation messages.
    fn allowed() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.as_str()).collect()
    }
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Extra `| "alias"` literals are accepted on parse but never emitted.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal $(| $alias:literal)*),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl StrEnum for $name {
            const ALL: &'static [$name] = &[$(Self::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s $(| $alias)* => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: DatabaseError| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

str_enum!(Role {
    Admin => "admin",
    User => "user",
});

impl Role {
    /// Dashboard subtree a signed-in user of this role lands on.
    pub fn home_path(&self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::User => "/",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Completed => "completed",
    Canceled => "canceled" | "cancelled",
});

str_enum!(ConsultationStatus {
    Pending => "pending",
    Completed => "completed",
    Billed => "billed",
});

str_enum!(TaskStatus {
    Pending => "pending" | "en attente",
    Done => "done" | "terminée",
    Failed => "failed" | "échouée",
});

str_enum!(DialysisType {
    Hemodialysis => "hemodialysis" | "Hémodialyse",
    PeritonealDialysis => "peritoneal_dialysis" | "Dialyse péritonéale",
});

impl DialysisType {
    /// Label shown on the ward dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hemodialysis => "Hémodialyse",
            Self::PeritonealDialysis => "Dialyse péritonéale",
        }
    }
}

str_enum!(BloodGroup {
    APositive => "A+",
    ANegative => "A-",
    BPositive => "B+",
    BNegative => "B-",
    AbPositive => "AB+",
    AbNegative => "AB-",
    OPositive => "O+",
    ONegative => "O-",
});

str_enum!(ReportFormat {
    Pdf => "pdf",
    Csv => "csv",
});

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }
}

str_enum!(TokenKind {
    Access => "access",
    Refresh => "refresh",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trips_canonical_strings() {
        for status in AppointmentStatus::ALL {
            assert_eq!(AppointmentStatus::from_str(status.as_str()).unwrap(), *status);
        }
    }

    #[test]
    fn accepts_dashboard_aliases() {
        assert_eq!(
            DialysisType::from_str("Hémodialyse").unwrap(),
            DialysisType::Hemodialysis
        );
        assert_eq!(
            DialysisType::from_str("Dialyse péritonéale").unwrap(),
            DialysisType::PeritonealDialysis
        );
        assert_eq!(TaskStatus::from_str("en attente").unwrap(), TaskStatus::Pending);
        assert_eq!(
            AppointmentStatus::from_str("cancelled").unwrap(),
            AppointmentStatus::Canceled
        );
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = ConsultationStatus::from_str("paid").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn serializes_as_canonical_string() {
        let json = serde_json::to_string(&BloodGroup::AbNegative).unwrap();
        assert_eq!(json, "\"AB-\"");
        let parsed: DialysisType = serde_json::from_str("\"Hémodialyse\"").unwrap();
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"hemodialysis\"");
    }

    #[test]
    fn role_home_paths_differ() {
        assert_eq!(Role::Admin.home_path(), "/admin");
        assert_eq!(Role::User.home_path(), "/");
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn allowed_lists_canonical_values_only() {
        assert_eq!(TaskStatus::allowed(), vec!["pending", "done", "failed"]);
    }
}

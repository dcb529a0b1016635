use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Hosteler / day-scholar tag used by the residence breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Residence {
    #[serde(rename = "hostel")]
    Hostel,
    #[serde(rename = "day-scholar")]
    DayScholar,
}

impl Residence {
    pub fn as_str(self) -> &'static str {
        match self {
            Residence::Hostel => "hostel",
            Residence::DayScholar => "day-scholar",
        }
    }

    pub fn parse(raw: &str) -> Option<Residence> {
        let t: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match t.as_str() {
            "hostel" | "hosteler" | "hosteller" => Some(Residence::Hostel),
            "dayscholar" => Some(Residence::DayScholar),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IatScores {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat_2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat_3: Option<String>,
}

impl IatScores {
    pub const COUNT: usize = 3;

    /// `iat` is 1-based, matching the field names.
    pub fn get(&self, iat: usize) -> Option<&str> {
        match iat {
            1 => self.iat_1.as_deref(),
            2 => self.iat_2.as_deref(),
            3 => self.iat_3.as_deref(),
            _ => None,
        }
    }

    pub fn set(&mut self, iat: usize, value: Option<String>) -> bool {
        let slot = match iat {
            1 => &mut self.iat_1,
            2 => &mut self.iat_2,
            3 => &mut self.iat_3,
            _ => return false,
        };
        *slot = value;
        true
    }

    pub fn values(&self) -> [Option<&str>; 3] {
        [self.get(1), self.get(2), self.get(3)]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_code: String,
    #[serde(default)]
    pub subject_name: String,
    #[serde(default)]
    pub scores: IatScores,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Present,
    Leave,
}

/// Present and leave date sets. The counters are derived from the set sizes
/// and never stored on their own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredLedger")]
pub struct AttendanceLedger {
    present_array: BTreeSet<NaiveDate>,
    leave_array: BTreeSet<NaiveDate>,
}

/// Date arrays as stored, before the two sets are made disjoint.
#[derive(Deserialize)]
struct StoredLedger {
    #[serde(default)]
    present_array: Vec<NaiveDate>,
    #[serde(default)]
    leave_array: Vec<NaiveDate>,
}

/// A date stored in both arrays counts as present, the same as marking it present last.
impl From<StoredLedger> for AttendanceLedger {
    fn from(stored: StoredLedger) -> Self {
        AttendanceLedger::from_dates(stored.present_array, stored.leave_array)
    }
}

impl AttendanceLedger {
    pub fn from_dates<P, L>(present: P, leave: L) -> Self
    where
        P: IntoIterator<Item = NaiveDate>,
        L: IntoIterator<Item = NaiveDate>,
    {
        let mut ledger = AttendanceLedger::default();
        for d in leave {
            ledger.mark(d, false);
        }
        for d in present {
            ledger.mark(d, true);
        }
        ledger
    }

    /// A date ends up in exactly one of the two sets.
    pub fn mark(&mut self, date: NaiveDate, present: bool) {
        if present {
            self.present_array.insert(date);
            self.leave_array.remove(&date);
        } else {
            self.leave_array.insert(date);
            self.present_array.remove(&date);
        }
    }

    pub fn present_dates(&self) -> &BTreeSet<NaiveDate> {
        &self.present_array
    }

    pub fn leave_dates(&self) -> &BTreeSet<NaiveDate> {
        &self.leave_array
    }

    pub fn total_attendance(&self) -> usize {
        self.present_array.len()
    }

    pub fn total_days(&self) -> usize {
        self.present_array.len() + self.leave_array.len()
    }

    pub fn status_on(&self, date: NaiveDate) -> Option<DayStatus> {
        if self.present_array.contains(&date) {
            Some(DayStatus::Present)
        } else if self.leave_array.contains(&date) {
            Some(DayStatus::Leave)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password_hash: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub register_number: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub residence: Option<Residence>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub institute_name: Option<String>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(flatten)]
    pub attendance: AttendanceLedger,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub accomplishments: Vec<String>,
}

impl StudentRecord {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            role,
            admin_password_hash: None,
            name: None,
            register_number: None,
            gender: None,
            residence: None,
            department: None,
            class: None,
            institute_name: None,
            subjects: Vec::new(),
            attendance: AttendanceLedger::default(),
            messages: Vec::new(),
            accomplishments: Vec::new(),
        }
    }

    pub fn subject_mut(&mut self, subject_code: &str) -> Option<&mut Subject> {
        self.subjects
            .iter_mut()
            .find(|s| s.subject_code == subject_code)
    }

    /// Client-facing form of the record: no credential hashes, counters included.
    pub fn view(&self) -> serde_json::Value {
        json!({
            "email": self.email,
            "role": self.role.as_str(),
            "name": self.name,
            "register_number": self.register_number,
            "gender": self.gender,
            "residence": self.residence.map(Residence::as_str),
            "department": self.department,
            "class": self.class,
            "institute_name": self.institute_name,
            "subjects": self.subjects,
            "present_array": self.attendance.present_dates(),
            "leave_array": self.attendance.leave_dates(),
            "total_attendance": self.attendance.total_attendance(),
            "total_days": self.attendance.total_days(),
            "messages": self.messages,
            "accomplishments": self.accomplishments,
        })
    }
}

/// Query-by-field filter over the record collection. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CohortFilter {
    pub role: Option<Role>,
    pub department: Option<String>,
    pub class: Option<String>,
    pub institute_name: Option<String>,
}

impl CohortFilter {
    pub fn matches(&self, record: &StudentRecord) -> bool {
        fn field_matches(want: &Option<String>, have: &Option<String>) -> bool {
            match want {
                None => true,
                Some(w) => have.as_deref() == Some(w.as_str()),
            }
        }
        self.role.map(|r| r == record.role).unwrap_or(true)
            && field_matches(&self.department, &record.department)
            && field_matches(&self.class, &record.class)
            && field_matches(&self.institute_name, &record.institute_name)
    }
}

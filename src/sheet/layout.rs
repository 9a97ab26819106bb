//! Mapping between header columns and named row fields.

use super::row::ContactRow;

/// A named field of [`ContactRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Status,
    Name,
    PhoneId,
    DialogId,
    UserId,
    ChatNumber,
    ErrorDetail,
    RegistrationId,
    StatusDetail,
}

const FIELD_COUNT: usize = 9;

/// Column order of the original spreadsheet, used when no header is recognized.
const LEGACY_ORDER: [Field; 5] = [
    Field::Status,
    Field::Name,
    Field::DialogId,
    Field::ChatNumber,
    Field::ErrorDetail,
];

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::Status,
        Field::Name,
        Field::PhoneId,
        Field::DialogId,
        Field::UserId,
        Field::ChatNumber,
        Field::ErrorDetail,
        Field::RegistrationId,
        Field::StatusDetail,
    ];

    /// Header written for a column this store adds.
    pub fn header(self) -> &'static str {
        match self {
            Field::Status => "status",
            Field::Name => "name",
            Field::PhoneId => "phoneId",
            Field::DialogId => "dialogId",
            Field::UserId => "userId",
            Field::ChatNumber => "chatNumber",
            Field::ErrorDetail => "errorDetail",
            Field::RegistrationId => "registrationId",
            Field::StatusDetail => "statusDetail",
        }
    }

    // Normalized (lowercase, alphanumeric only) header spellings.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Status => &["status", "cadastrado"],
            Field::Name => &["name", "nome"],
            Field::PhoneId => &["phoneid"],
            Field::DialogId => &["dialogid", "iddodiálogo", "iddodialogo"],
            Field::UserId => &["userid", "iddousuário", "iddousuario"],
            Field::ChatNumber => &["chatnumber", "número", "numero"],
            Field::ErrorDetail => &["errordetail", "erro", "error"],
            Field::RegistrationId => &["registrationid", "chataddid"],
            Field::StatusDetail => &["statusdetail", "chataddstatus"],
        }
    }

    pub fn from_header(header: &str) -> Option<Field> {
        let normalized: String = header
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        Field::ALL
            .into_iter()
            .find(|field| field.aliases().contains(&normalized.as_str()))
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn get(self, row: &ContactRow) -> &str {
        match self {
            Field::Status => &row.status,
            Field::Name => &row.name,
            Field::PhoneId => &row.phone_id,
            Field::DialogId => &row.dialog_id,
            Field::UserId => &row.user_id,
            Field::ChatNumber => &row.chat_number,
            Field::ErrorDetail => &row.error_detail,
            Field::RegistrationId => &row.registration_id,
            Field::StatusDetail => &row.status_detail,
        }
    }

    pub fn set(self, row: &mut ContactRow, value: String) {
        let slot = match self {
            Field::Status => &mut row.status,
            Field::Name => &mut row.name,
            Field::PhoneId => &mut row.phone_id,
            Field::DialogId => &mut row.dialog_id,
            Field::UserId => &mut row.user_id,
            Field::ChatNumber => &mut row.chat_number,
            Field::ErrorDetail => &mut row.error_detail,
            Field::RegistrationId => &mut row.registration_id,
            Field::StatusDetail => &mut row.status_detail,
        };
        *slot = value;
    }
}

/// Column index of every field within a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: [usize; FIELD_COUNT],
}

impl ColumnLayout {
    /// Resolve every field against `headers`, appending a column for each
    /// field that is not present. Existing headers are never reordered.
    pub fn resolve(headers: &mut Vec<String>) -> Self {
        let mut found: [Option<usize>; FIELD_COUNT] = [None; FIELD_COUNT];

        for (position, header) in headers.iter().enumerate() {
            if let Some(field) = Field::from_header(header) {
                let slot = &mut found[field.index()];
                if slot.is_none() {
                    *slot = Some(position);
                }
            }
        }

        if found.iter().all(Option::is_none) {
            for (position, field) in LEGACY_ORDER.into_iter().enumerate() {
                if position < headers.len() {
                    found[field.index()] = Some(position);
                }
            }
        }

        let mut columns = [0; FIELD_COUNT];
        for field in Field::ALL {
            columns[field.index()] = match found[field.index()] {
                Some(position) => position,
                None => {
                    headers.push(field.header().to_string());
                    headers.len() - 1
                }
            };
        }

        Self { columns }
    }

    pub fn column(&self, field: Field) -> usize {
        self.columns[field.index()]
    }

    pub fn read_row(&self, cells: &[String]) -> ContactRow {
        let mut row = ContactRow::default();
        for field in Field::ALL {
            let value = cells.get(self.column(field)).cloned().unwrap_or_default();
            field.set(&mut row, value);
        }
        row
    }

    pub fn write_row(&self, row: &ContactRow, cells: &mut [String]) {
        for field in Field::ALL {
            if let Some(cell) = cells.get_mut(self.column(field)) {
                *cell = field.get(row).to_string();
            }
        }
    }
}

use uuid::Uuid;

/// Random v4 UUID (122 bits from the OS random source), lowercase hyphenated.
pub fn new_token() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

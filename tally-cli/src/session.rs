/// What one chat has selected so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub source: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    /// The next text message is a batch of pasted notifications
    pub sms_mode: bool,
}

impl Session {
    pub fn clear_selection(&mut self) {
        self.category = None;
        self.subcategory = None;
    }

    /// Menu items that still need picking before a manual entry can be written.
    pub fn missing_for_manual(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.source.is_none() {
            missing.push("Источник");
        }
        match (&self.category, &self.subcategory) {
            (None, _) => missing.push("Категорию"),
            (Some(_), None) => missing.push("Подкатегорию"),
            _ => {}
        }
        missing
    }
}

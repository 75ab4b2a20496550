use serde::{Deserialize, Serialize};

/// Structured contact payload rendered as a vCard 3.0 document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContactCard {
    pub first_name: String,
    pub last_name: Option<String>,
    pub phones: Vec<String>,
    pub email: Option<String>,
    pub organization: Option<String>,
}

impl ContactCard {
    pub fn new(first_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            ..Self::default()
        }
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phones.push(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            "BEGIN:VCARD".to_string(),
            "VERSION:3.0".to_string(),
            format!(
                "N:{};{};;;",
                escape(self.last_name.as_deref().unwrap_or_default()),
                escape(&self.first_name)
            ),
            format!("FN:{}", escape(&self.full_name())),
        ];
        if let Some(organization) = &self.organization {
            lines.push(format!("ORG:{}", escape(organization)));
        }
        for phone in &self.phones {
            lines.push(format!("TEL;TYPE=CELL:{phone}"));
        }
        if let Some(email) = &self.email {
            lines.push(format!("EMAIL;TYPE=INTERNET:{email}"));
        }
        lines.push("END:VCARD".to_string());

        let mut card = lines.join("\r\n");
        card.push_str("\r\n");
        card
    }
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(';', "\\;")
        .replace('\n', "\\n")
}

/// Splits a payload holding one or more vCard documents into individual cards.
pub fn split_cards(payload: &str) -> Vec<String> {
    let mut cards = Vec::new();
    let mut current = Vec::new();
    for line in payload.lines() {
        let line = line.trim_end_matches('\r');
        if line.eq_ignore_ascii_case("BEGIN:VCARD") {
            current.clear();
        }
        current.push(line);
        if line.eq_ignore_ascii_case("END:VCARD") {
            cards.push(current.join("\r\n"));
            current.clear();
        }
    }
    cards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_vcard_document() {
        let card = ContactCard::new("John")
            .with_last_name("Doe")
            .with_phone("9611111111")
            .with_organization("Itnovado, Inc");

        assert_eq!(
            card.render(),
            "BEGIN:VCARD\r\nVERSION:3.0\r\nN:Doe;John;;;\r\nFN:John Doe\r\n\
             ORG:Itnovado\\, Inc\r\nTEL;TYPE=CELL:9611111111\r\nEND:VCARD\r\n"
        );
    }

    #[test]
    fn splits_concatenated_cards() {
        let payload = format!(
            "{}{}",
            ContactCard::new("Ann").render(),
            ContactCard::new("Ben").render()
        );
        let cards = split_cards(&payload);
        assert_eq!(cards.len(), 2);
        assert!(cards[1].contains("FN:Ben"));
    }
}

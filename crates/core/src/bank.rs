use serde::{Deserialize, Serialize};

/// One configured sender pattern for a financial institution.
///
/// DLT sender IDs vary by telecom route ("VM-HDFCBK", "AD-HDFCBK", ...), so a
/// bank typically owns several identifiers mapping to one display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankIdentifier {
    pub identifier: String,
    pub bank_name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl BankIdentifier {
    pub fn new(identifier: &str, bank_name: &str) -> Self {
        BankIdentifier {
            identifier: identifier.to_string(),
            bank_name: bank_name.to_string(),
            active: true,
        }
    }
}

/// Ordered collection of bank identifiers. Order is precedence: `classify`
/// returns the first entry whose pattern is contained in the sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankDirectory {
    entries: Vec<BankIdentifier>,
}

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    banks: Vec<BankIdentifier>,
}

impl BankDirectory {
    pub fn new(entries: Vec<BankIdentifier>) -> Self {
        BankDirectory { entries }
    }

    /// Parse a `[[banks]]` table list.
    pub fn from_toml(toml_content: &str) -> Result<Self, String> {
        let file: DirectoryFile =
            toml::from_str(toml_content).map_err(|e| format!("Failed to parse TOML: {e}"))?;
        Ok(Self::new(file.banks))
    }

    /// Parse a JSON array of identifiers (the export format of the mobile app).
    pub fn from_json(json: &str) -> Result<Self, String> {
        let entries: Vec<BankIdentifier> =
            serde_json::from_str(json).map_err(|e| format!("Failed to parse JSON: {e}"))?;
        Ok(Self::new(entries))
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(&self.entries).map_err(|e| e.to_string())
    }

    pub fn entries(&self) -> &[BankIdentifier] {
        &self.entries
    }

    /// Classify a sender against the directory.
    ///
    /// Matching is case-insensitive substring containment; the first active
    /// entry in configured order wins — no scoring, no longest-match
    /// preference. Returns `None` for non-bank senders, which is the common
    /// case and not an error.
    pub fn classify(&self, sender: &str) -> Option<&BankIdentifier> {
        let sender = sender.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| entry.active)
            .find(|entry| sender.contains(&entry.identifier.to_lowercase()))
    }
}

impl Default for BankDirectory {
    /// The stock directory of Indian bank sender IDs.
    fn default() -> Self {
        BankDirectory::new(vec![
            BankIdentifier::new("VM-HDFCBK", "HDFC Bank"),
            BankIdentifier::new("VK-HDFCBK", "HDFC Bank"),
            BankIdentifier::new("AD-HDFCBK", "HDFC Bank"),
            BankIdentifier::new("VM-ICICIB", "ICICI Bank"),
            BankIdentifier::new("VK-ICICIB", "ICICI Bank"),
            BankIdentifier::new("VM-SBIBNK", "State Bank of India"),
            BankIdentifier::new("VK-SBIBNK", "State Bank of India"),
            BankIdentifier::new("VM-AXISB", "Axis Bank"),
            BankIdentifier::new("VK-AXIBNK", "Axis Bank"),
            BankIdentifier::new("VM-KOTAKB", "Kotak Bank"),
            BankIdentifier::new("VK-KOTAKB", "Kotak Bank"),
            BankIdentifier::new("VM-PAYTM", "Paytm Payments Bank"),
            BankIdentifier::new("VK-PYTMB", "Paytm Payments Bank"),
            BankIdentifier::new("VM-IDFCFB", "IDFC First Bank"),
            BankIdentifier::new("VK-IDFCFB", "IDFC First Bank"),
        ])
    }
}

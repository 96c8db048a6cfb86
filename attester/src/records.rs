//! The documents this tool attests.
//!
//! Field order is leaf order: proof indexes refer to positions in these lists.

use private_data::Field;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    /// Used in logs and to derive the document's salt stream.
    pub label: &'static str,
    /// Prefix of the `<stem>Attestation.json` / `<stem>Proof.json` output files.
    pub file_stem: &'static str,
    pub fields: Vec<Field>,
}

impl Document {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every index, for a proof that reveals the whole document.
    pub fn all_indexes(&self) -> Vec<usize> {
        (0..self.fields.len()).collect()
    }

    pub fn attestation_file(&self) -> String {
        format!("{}Attestation.json", self.file_stem)
    }

    pub fn proof_file(&self) -> String {
        format!("{}Proof.json", self.file_stem)
    }
}

pub fn medical_record() -> Document {
    Document {
        label: "medical-record",
        file_stem: "medicalRecord",
        fields: vec![
            Field::string("name", "Alice Johnson"),
            Field::uint256("age", 28u64),
            Field::bool("isInsured", true),
            Field::string("diagnosis", "Hypertension"),
        ],
    }
}

pub fn prescription() -> Document {
    Document {
        label: "prescription",
        file_stem: "prescription",
        fields: vec![
            Field::string("prescriptionId", "presc-001"),
            Field::string("medication", "Lisinopril 10mg"),
            Field::string("dosage", "Take one tablet daily"),
            Field::string("duration", "30 days"),
        ],
    }
}

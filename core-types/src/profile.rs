use serde::{Deserialize, Serialize};

/// A named, reusable set of lens values applied to files during import.
///
/// Optional values are kept as the text the user typed (`85mm`, `f/2.8`);
/// normalizing them into tag values is the writer's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataProfile {
    pub name: String,
    #[serde(default)]
    pub lens_make: String,
    #[serde(default)]
    pub lens_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens_serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aperture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    LensMake,
    LensModel,
    LensSerial,
    FocalLength,
    Aperture,
    Notes,
}

impl ProfileField {
    pub fn label(self) -> &'static str {
        match self {
            Self::LensMake => "lens make",
            Self::LensModel => "lens model",
            Self::LensSerial => "lens serial",
            Self::FocalLength => "focal length",
            Self::Aperture => "aperture",
            Self::Notes => "notes",
        }
    }
}

impl MetadataProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Non-blank fields in a stable order, trimmed.
    ///
    /// Blank fields are left out entirely so they never clear tags that
    /// already exist in the target file.
    pub fn fields(&self) -> Vec<(ProfileField, &str)> {
        let candidates = [
            (ProfileField::LensMake, Some(self.lens_make.as_str())),
            (ProfileField::LensModel, Some(self.lens_model.as_str())),
            (ProfileField::LensSerial, self.lens_serial.as_deref()),
            (ProfileField::FocalLength, self.focal_length.as_deref()),
            (ProfileField::Aperture, self.aperture.as_deref()),
            (ProfileField::Notes, self.notes.as_deref()),
        ];

        candidates
            .into_iter()
            .filter_map(|(field, value)| {
                let trimmed = value?.trim();
                (!trimmed.is_empty()).then_some((field, trimmed))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

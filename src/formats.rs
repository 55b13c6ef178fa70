//! Format catalog: the fixed, ordered set of conversion targets.
//!
//! The catalog is pure data. Source formats are never chosen from it directly;
//! they are inferred from the submitted file name (see
//! [`infer_source_format`]) and left empty when the name has no extension, in
//! which case the remote service auto-detects.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A conversion target offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// Stereolithography mesh. (default)
    #[default]
    Stl,
    /// ISO 10303 STEP, `.step` spelling.
    Step,
    /// ISO 10303 STEP, `.stp` spelling.
    Stp,
    /// Wavefront OBJ mesh.
    Obj,
    /// 3D Manufacturing Format.
    #[serde(rename = "3mf")]
    ThreeMf,
}

impl TargetFormat {
    /// Every catalog entry, in the order presented to the user.
    pub const ALL: [TargetFormat; 5] = [
        TargetFormat::Stl,
        TargetFormat::Step,
        TargetFormat::Stp,
        TargetFormat::Obj,
        TargetFormat::ThreeMf,
    ];

    /// Wire identifier, also used as the artifact file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetFormat::Stl => "stl",
            TargetFormat::Step => "step",
            TargetFormat::Stp => "stp",
            TargetFormat::Obj => "obj",
            TargetFormat::ThreeMf => "3mf",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    /// Case-insensitive; a leading dot is accepted (`".STL"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().trim_start_matches('.').to_ascii_lowercase();
        TargetFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == needle)
            .ok_or_else(|| ConvertError::UnknownFormat(s.to_string()))
    }
}

/// Derive the source format from a file name: the lower-cased extension, or
/// an empty string when there is none.
pub fn infer_source_format(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Media type sent as `Content-Type` for an upload of `file_name`.
pub fn content_type_for(file_name: &str) -> &'static str {
    match infer_source_format(file_name).as_str() {
        "stl" => "model/stl",
        "step" | "stp" => "model/step",
        "obj" => "model/obj",
        "3mf" => "model/3mf",
        _ => "application/octet-stream",
    }
}

/// Name of the converted artifact for `file_name`: `<stem>.<target>`.
pub fn artifact_file_name(file_name: &str, target: TargetFormat) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "converted".to_string());
    format!("{stem}.{}", target.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_is_fixed() {
        let ids: Vec<&str> = TargetFormat::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(ids, vec!["stl", "step", "stp", "obj", "3mf"]);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("STL".parse::<TargetFormat>().unwrap(), TargetFormat::Stl);
        assert_eq!(".3MF".parse::<TargetFormat>().unwrap(), TargetFormat::ThreeMf);
        assert_eq!(" stp ".parse::<TargetFormat>().unwrap(), TargetFormat::Stp);
        assert!(matches!(
            "iges".parse::<TargetFormat>(),
            Err(ConvertError::UnknownFormat(_))
        ));
    }

    #[test]
    fn serde_uses_wire_identifiers() {
        assert_eq!(serde_json::to_string(&TargetFormat::ThreeMf).unwrap(), "\"3mf\"");
        let f: TargetFormat = serde_json::from_str("\"obj\"").unwrap();
        assert_eq!(f, TargetFormat::Obj);
    }

    #[test]
    fn source_format_inference() {
        assert_eq!(infer_source_format("bracket.STEP"), "step");
        assert_eq!(infer_source_format("mesh.final.Obj"), "obj");
        assert_eq!(infer_source_format("README"), "");
        assert_eq!(infer_source_format(".hidden"), "");
        assert_eq!(infer_source_format(""), "");
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("a.stl"), "model/stl");
        assert_eq!(content_type_for("a.STP"), "model/step");
        assert_eq!(content_type_for("a.3mf"), "model/3mf");
        assert_eq!(content_type_for("a.iges"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn artifact_names_swap_extension() {
        assert_eq!(artifact_file_name("part.step", TargetFormat::Stl), "part.stl");
        assert_eq!(artifact_file_name("a.b.obj", TargetFormat::ThreeMf), "a.b.3mf");
        assert_eq!(artifact_file_name("noext", TargetFormat::Obj), "noext.obj");
    }
}

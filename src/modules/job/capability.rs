//! Pre-flight check deciding whether an input file can be converted at all.
//!
//! The decision is made from the file extension only, so it is pure and can
//! run before any engine is started.

use std::path::Path;

use super::model::TargetFormat;

/// Word-processing formats LibreOffice Writer imports.
const TEXT_DOCUMENTS: &[&str] = &[
    "doc", "docx", "docm", "dot", "dotx", "dotm", "odt", "ott", "fodt", "rtf", "txt", "wpd",
    "wps", "wri", "lwp", "abw", "pages", "sxw", "stw", "uot", "xml",
];

/// Spreadsheet formats LibreOffice Calc imports.
const SPREADSHEETS: &[&str] = &[
    "xls", "xlsx", "xlsm", "xlsb", "xlt", "xltx", "ods", "ots", "fods", "csv", "tsv", "numbers",
    "sxc", "uos", "dif", "slk",
];

/// Presentation formats LibreOffice Impress imports.
const PRESENTATIONS: &[&str] = &[
    "ppt", "pptx", "pptm", "pps", "ppsx", "pot", "potx", "odp", "otp", "fodp", "key", "sxi",
    "uop",
];

const DRAWINGS: &[&str] = &["odg", "otg", "fodg", "vsd", "vsdx", "sxd", "cdr", "pub"];

const WEB_DOCUMENTS: &[&str] = &["html", "htm", "xhtml"];

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(str::to_ascii_lowercase)
}

fn accepted_families(target: TargetFormat) -> &'static [&'static [&'static str]] {
    match target {
        TargetFormat::Pdf => &[
            TEXT_DOCUMENTS,
            SPREADSHEETS,
            PRESENTATIONS,
            DRAWINGS,
            WEB_DOCUMENTS,
        ],
        TargetFormat::Odt | TargetFormat::Docx => &[TEXT_DOCUMENTS, WEB_DOCUMENTS],
    }
}

/// Whether `filename` can be converted to `target`.
///
/// Files without an extension, and files already in the target format, are
/// never convertible.
pub fn can_convert(filename: &str, target: TargetFormat) -> bool {
    let Some(ext) = extension_of(filename) else {
        return false;
    };

    if ext == target.extension() {
        return false;
    }

    accepted_families(target)
        .iter()
        .any(|family| family.contains(&ext.as_str()))
}

use std::io::{self, Cursor, Read};
use std::path::Path;

use crate::error::{Error, ValidationError};

/// Longest signature inspected (compound-document magic).
pub const SIGNATURE_LEN: usize = 8;

/// Uploads shorter than this cannot hold any accepted signature.
pub const MIN_UPLOAD_BYTES: usize = SIGNATURE_LEN;

const ZIP_LOCAL_HEADER: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
const OLE_COMPOUND: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const EXECUTABLE_SIGNATURES: &[(&[u8], &str)] = &[
    (b"MZ", "Windows"),
    (&[0x7F, b'E', b'L', b'F'], "ELF"),
    (&[0xFE, 0xED, 0xFA, 0xCE], "Mach-O"),
    (&[0xFE, 0xED, 0xFA, 0xCF], "Mach-O"),
    (&[0xCE, 0xFA, 0xED, 0xFE], "Mach-O"),
    (&[0xCF, 0xFA, 0xED, 0xFE], "Mach-O"),
];

/// Accepted upload formats, keyed by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Xlsx,
    Xlsm,
    Xls,
    Zip,
}

impl UploadKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(UploadKind::Xlsx),
            "xlsm" => Some(UploadKind::Xlsm),
            "xls" => Some(UploadKind::Xls),
            "zip" => Some(UploadKind::Zip),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            UploadKind::Xlsx => "xlsx",
            UploadKind::Xlsm => "xlsm",
            UploadKind::Xls => "xls",
            UploadKind::Zip => "zip",
        }
    }

    pub fn is_archive(self) -> bool {
        self == UploadKind::Zip
    }

    pub fn is_spreadsheet(self) -> bool {
        !self.is_archive()
    }

    fn signature(self) -> (&'static [u8], &'static str) {
        match self {
            UploadKind::Xls => (&OLE_COMPOUND, "compound document"),
            _ => (&ZIP_LOCAL_HEADER, "ZIP"),
        }
    }
}

/// Lowercased extension of a declared name; directory parts are ignored.
pub fn declared_extension(declared_name: &str) -> Option<String> {
    let file_name = declared_name.rsplit(['/', '\\']).next().unwrap_or(declared_name);
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
}

/// Validates `data` as a whole. `data.len()` is the upload size.
pub fn validate_bytes(data: &[u8], declared_name: &str) -> Result<UploadKind, Error> {
    let header = &data[..data.len().min(SIGNATURE_LEN)];
    check(header, data.len(), declared_name)
}

/// Reads only the header, then hands back a reader that replays it followed
/// by the untouched remainder of `reader`.
pub fn inspect<R: Read>(
    mut reader: R,
    declared_name: &str,
) -> Result<(UploadKind, io::Chain<Cursor<Vec<u8>>, R>), Error> {
    let mut header = Vec::with_capacity(SIGNATURE_LEN);
    (&mut reader)
        .take(SIGNATURE_LEN as u64)
        .read_to_end(&mut header)?;
    let kind = check(&header, header.len(), declared_name)?;
    Ok((kind, Cursor::new(header).chain(reader)))
}

fn check(header: &[u8], len: usize, declared_name: &str) -> Result<UploadKind, Error> {
    if len == 0 {
        return Err(ValidationError::Empty.into());
    }

    // Executables are refused whatever extension they claim.
    if let Some((_, family)) = EXECUTABLE_SIGNATURES
        .iter()
        .find(|(magic, _)| header.starts_with(magic))
    {
        return Err(ValidationError::ExecutableSignature(family).into());
    }

    if len < MIN_UPLOAD_BYTES {
        return Err(ValidationError::TooSmall {
            len,
            min: MIN_UPLOAD_BYTES,
        }
        .into());
    }

    let extension = declared_extension(declared_name).ok_or(ValidationError::MissingExtension)?;
    let kind = UploadKind::from_extension(&extension)
        .ok_or_else(|| ValidationError::UnsupportedExtension(extension.clone()))?;

    let (magic, expected) = kind.signature();
    if !header.starts_with(magic) {
        return Err(ValidationError::SignatureMismatch {
            extension,
            expected,
        }
        .into());
    }

    Ok(kind)
}

//! Catalog members, and resolving them into [`CatalogEntry`] values.

use std::fmt;

use der::asn1::OctetString;
use der::Sequence;
use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::ser::SerializeStruct;
#[cfg(feature = "serde")]
use serde::{ser, Serialize};

use crate::{
    CatalogError, DigestAlgorithm, MemberAttribute, MemberAttributeContent, OrderedSetOf,
    BINARY_MARKER,
};

/// Decodes little-endian UTF-16 text, with no byte-order mark handling.
///
/// The conversion is exact: NUL terminators are kept.
pub fn decode_utf16le(bytes: &[u8]) -> Result<String, CatalogError> {
    if bytes.len() % 2 != 0 {
        return Err(CatalogError::Utf16Length(bytes.len()));
    }

    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect::<Vec<_>>();

    Ok(String::from_utf16(&units)?)
}

/// A single member of a catalog, typically one file.
///
/// ```asn1
/// CatalogMember ::= SEQUENCE {
///   tag OCTETSTRING,
///   attributes SET OF MemberAttribute OPTIONAL
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CatalogMember {
    tag: OctetString,
    /// The member's attributes, in encoded order.
    pub attributes: Option<OrderedSetOf<MemberAttribute>>,
}

impl CatalogMember {
    /// Creates a member from its tag and attributes.
    pub fn new(tag: OctetString, attributes: Vec<MemberAttribute>) -> Self {
        Self {
            tag,
            attributes: Some(attributes.into()),
        }
    }

    /// Returns the member's tag, as bytes.
    ///
    /// Catalog tools use the member's hash, as UTF-16LE hex, or a
    /// caller-chosen name.
    pub fn tag(&self) -> &[u8] {
        self.tag.as_bytes()
    }

    /// Returns the member's tag as text, if it is UTF-16LE.
    pub fn tag_name(&self) -> Option<String> {
        decode_utf16le(self.tag())
            .ok()
            .map(|name| name.trim_end_matches('\0').to_string())
    }

    /// Returns an iterator over this member's attributes.
    pub fn attributes(&self) -> impl Iterator<Item = &MemberAttribute> {
        self.attributes.iter().flat_map(|attrs| attrs.iter())
    }

    /// Resolves this member's filename and digest.
    ///
    /// Returns `Ok(None)` for a member that lacks either one.
    pub fn resolve(&self) -> Result<Option<CatalogEntry>, CatalogError> {
        let resolution = self
            .attributes()
            .map(MemberAttribute::contents)
            .flatten_ok()
            .fold_ok(Resolution::default(), Resolution::step)?;

        let entry = resolution.finish()?;
        if entry.is_none() {
            log::debug!(
                "member {:?} has no filename or no usable digest; skipping",
                self.tag_name()
            );
        }

        Ok(entry)
    }
}

#[cfg(feature = "serde")]
impl Serialize for CatalogMember {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let entry = self
            .resolve()
            .map_err(|e| ser::Error::custom(format!("member resolution failed: {e}")))?;
        let attribute_oids = self
            .attributes()
            .map(|attr| attr.oid.to_string())
            .collect::<Vec<_>>();

        let mut s = serializer.serialize_struct("CatalogMember", 4)?;
        s.serialize_field("tag", &hex::encode(self.tag()))?;
        s.serialize_field("tag_name", &self.tag_name())?;
        s.serialize_field("attributes", &attribute_oids)?;
        s.serialize_field("entry", &entry)?;
        s.end()
    }
}

/// The running state of a member's resolution.
///
/// Contents are folded in one at a time; a later qualifying filename or
/// digest replaces an earlier one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Resolution {
    /// The raw (UTF-16LE) filename, if seen.
    pub filename: Option<Vec<u8>>,
    /// The digest and its algorithm, if seen.
    pub digest: Option<(DigestAlgorithm, Vec<u8>)>,
}

impl Resolution {
    /// Folds one decoded attribute content into the resolution.
    pub fn step(mut self, content: MemberAttributeContent) -> Self {
        match content {
            MemberAttributeContent::NameValue(name_value) if name_value.is_filename() => {
                self.filename = Some(name_value.value.as_bytes().to_vec());
            }
            MemberAttributeContent::IndirectData(data) => {
                if let Some(algorithm) = data.cabinet_digest_algorithm() {
                    let digest = data.message_digest.digest.as_bytes().to_vec();
                    self.digest = Some((algorithm, digest));
                }
            }
            MemberAttributeContent::NameValue(_) => {}
        }

        self
    }

    /// Produces an entry if both a filename and a digest were found.
    pub fn finish(self) -> Result<Option<CatalogEntry>, CatalogError> {
        match (self.filename, self.digest) {
            (Some(raw_filename), Some((digest_algorithm, digest))) => Ok(Some(CatalogEntry::new(
                digest_algorithm,
                digest,
                raw_filename,
            )?)),
            _ => Ok(None),
        }
    }
}

/// A resolved catalog member: a filename and its digest.
///
/// Displays as a `sha256sum`-style line (without the trailing newline).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CatalogEntry {
    digest_algorithm: DigestAlgorithm,
    digest: Vec<u8>,
    raw_filename: Vec<u8>,
    filename: String,
}

impl CatalogEntry {
    /// Creates an entry, decoding `raw_filename` as UTF-16LE.
    pub fn new(
        digest_algorithm: DigestAlgorithm,
        digest: Vec<u8>,
        raw_filename: Vec<u8>,
    ) -> Result<Self, CatalogError> {
        let filename = decode_utf16le(&raw_filename)?;

        Ok(Self {
            digest_algorithm,
            digest,
            raw_filename,
            filename,
        })
    }

    /// The algorithm the digest was computed with.
    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    /// The digest bytes.
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// The digest, as lowercase hex.
    pub fn hex_digest(&self) -> String {
        hex::encode(&self.digest)
    }

    /// The filename exactly as stored, in UTF-16LE.
    pub fn raw_filename(&self) -> &[u8] {
        &self.raw_filename
    }

    /// The filename, decoded but otherwise exactly as stored (including any NUL terminator).
    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{}",
            self.hex_digest(),
            BINARY_MARKER,
            self.filename()
        )
    }
}

#[cfg(feature = "serde")]
impl Serialize for CatalogEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("CatalogEntry", 3)?;
        s.serialize_field("algorithm", self.digest_algorithm.name())?;
        s.serialize_field("digest", &self.hex_digest())?;
        s.serialize_field("filename", self.filename())?;
        s.end()
    }
}

//! Catalog member attributes, and the decoding of their contents.

use std::fmt;

use der::asn1::{Any, BmpString, ObjectIdentifier, OctetString};
use der::{Choice, Sequence};
use spki::AlgorithmIdentifierOwned;

use crate::{CatalogError, OrderedSetOf};

/// `CAT_NAMEVALUE_OBJID`: a free-form name/value pair, such as `Filename`.
pub const MS_CATALOG_NAME_VALUE_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.12.2.1");

/// `CAT_MEMBERINFO_OBJID`: subject GUID and version.
pub const MS_CATALOG_MEMBER_INFO_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.12.2.2");

/// `CAT_MEMBERINFO2_OBJID`.
pub const MS_CATALOG_MEMBER_INFO2_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.12.2.3");

/// `SPC_INDIRECT_DATA_OBJID`: the member's digest.
pub const SPC_INDIRECT_DATA_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.2.1.4");

/// `SPC_CAB_DATA_OBJID`: the "flat file" digest type, used for all catalog members.
pub const SPC_CAB_DATA_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.2.1.25");

/// The OID for SHA-1.
pub const SHA1_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");

/// The OID for SHA-256.
pub const SHA256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");

/// The name-value name that carries a member's filename.
pub const FILENAME_NAME: &str = "Filename";

/// A single attribute on a catalog member.
///
/// ```asn1
/// MemberAttribute ::= SEQUENCE {
///   type OBJECT IDENTIFIER,
///   values SET OF ANY DEFINED BY type
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct MemberAttribute {
    /// Selects the schema every entry in `values` follows.
    pub oid: ObjectIdentifier,

    /// The attribute's entries, still encoded.
    pub values: OrderedSetOf<Any>,
}

impl MemberAttribute {
    /// Decodes every entry of this attribute, in encoded order.
    ///
    /// Attributes that carry nothing of interest yield no contents; attributes
    /// of an unknown type are an error.
    pub fn contents(&self) -> Result<Vec<MemberAttributeContent>, CatalogError> {
        let contents = match AttributeKind::from_oid(&self.oid)? {
            AttributeKind::MemberInfo => return Ok(Vec::new()),
            AttributeKind::NameValue => self
                .values
                .iter()
                .map(|value| value.decode_as().map(MemberAttributeContent::NameValue))
                .collect::<Result<Vec<_>, der::Error>>()?,
            AttributeKind::IndirectData => self
                .values
                .iter()
                .map(|value| value.decode_as().map(MemberAttributeContent::IndirectData))
                .collect::<Result<Vec<_>, der::Error>>()?,
        };

        log::trace!("attribute {}: {} content(s)", self.oid, contents.len());
        Ok(contents)
    }
}

/// The member attribute types this crate understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttributeKind {
    /// Entries are [`CatalogNameValue`]s.
    NameValue,
    /// Member info (v1 or v2). Recognized, but nothing is extracted from it.
    MemberInfo,
    /// Entries are [`SpcIndirectData`]s.
    IndirectData,
}

impl AttributeKind {
    const REGISTRY: &'static [(ObjectIdentifier, AttributeKind)] = &[
        (MS_CATALOG_NAME_VALUE_OID, AttributeKind::NameValue),
        (MS_CATALOG_MEMBER_INFO_OID, AttributeKind::MemberInfo),
        (MS_CATALOG_MEMBER_INFO2_OID, AttributeKind::MemberInfo),
        (SPC_INDIRECT_DATA_OID, AttributeKind::IndirectData),
    ];

    /// Looks up the kind of attribute identified by `oid`.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, CatalogError> {
        Self::REGISTRY
            .iter()
            .find(|(known, _)| known == oid)
            .map(|(_, kind)| *kind)
            .ok_or(CatalogError::UnknownAttribute(*oid))
    }
}

/// A decoded entry of a [`MemberAttribute`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemberAttributeContent {
    /// A name/value pair.
    NameValue(CatalogNameValue),
    /// A digest of the member.
    IndirectData(SpcIndirectData),
}

/// The name half of a [`CatalogNameValue`].
///
/// Catalog tools write a `BMPString`; the other character string types are
/// accepted as well.
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum NameValueTag {
    /// `BMPString`
    Bmp(BmpString),

    /// `UTF8String`
    #[asn1(type = "UTF8String")]
    Utf8(String),

    /// `IA5String`
    #[asn1(type = "IA5String")]
    Ia5(String),

    /// `PrintableString`
    #[asn1(type = "PrintableString")]
    Printable(String),

    /// `TeletexString`
    #[asn1(type = "TeletexString")]
    Teletex(String),
}

impl fmt::Display for NameValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameValueTag::Bmp(s) => fmt::Display::fmt(s, f),
            NameValueTag::Utf8(s)
            | NameValueTag::Ia5(s)
            | NameValueTag::Printable(s)
            | NameValueTag::Teletex(s) => f.write_str(s),
        }
    }
}

/// ```asn1
/// CatalogNameValue ::= SEQUENCE {
///   tag BMPString,
///   flags INTEGER,
///   value OCTET STRING
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CatalogNameValue {
    /// The name, e.g. `Filename` or `OSAttr`.
    pub name: NameValueTag,

    /// `CRYPTCAT_ATTR_*` flags.
    pub flags: Any,

    /// The value, typically NUL-terminated UTF-16LE text.
    pub value: OctetString,
}

impl CatalogNameValue {
    /// Returns `true` if this pair holds the member's filename.
    pub fn is_filename(&self) -> bool {
        self.name.to_string() == FILENAME_NAME
    }
}

/// ```asn1
/// DigestInfo ::= SEQUENCE {
///   digestAlgorithm AlgorithmIdentifier,
///   digest OCTETSTRING
/// }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct DigestInfo {
    /// How `digest` was computed.
    pub digest_algorithm: AlgorithmIdentifierOwned,

    /// The digest bytes.
    pub digest: OctetString,
}

/// ```asn1
/// SpcIndirectDataContent ::= SEQUENCE {
///   data SpcAttributeTypeAndOptionalValue,
///   messageDigest DigestInfo
/// }
///
/// SpcAttributeTypeAndOptionalValue ::= SEQUENCE {
///   type ObjectID,
///   value [0] EXPLICIT ANY OPTIONAL
/// }
/// ```
///
/// `SpcAttributeTypeAndOptionalValue` has the same shape as an `AlgorithmIdentifier`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SpcIndirectData {
    /// What was digested.
    pub data: AlgorithmIdentifierOwned,

    /// The digest.
    pub message_digest: DigestInfo,
}

impl SpcIndirectData {
    /// Returns the digest algorithm if this is a flat-file digest made with an algorithm
    /// this crate recognizes.
    pub fn cabinet_digest_algorithm(&self) -> Option<DigestAlgorithm> {
        if self.data.oid != SPC_CAB_DATA_OID {
            return None;
        }

        DigestAlgorithm::from_oid(&self.message_digest.digest_algorithm.oid)
    }
}

/// The digest algorithms catalog entries can be produced with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DigestAlgorithm {
    /// SHA-1, 20 bytes.
    Sha1,
    /// SHA-256, 32 bytes.
    Sha256,
}

impl DigestAlgorithm {
    /// Maps an algorithm OID to a `DigestAlgorithm`.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        if *oid == SHA1_OID {
            Some(Self::Sha1)
        } else if *oid == SHA256_OID {
            Some(Self::Sha256)
        } else {
            None
        }
    }

    /// The algorithm's OID.
    pub fn oid(&self) -> ObjectIdentifier {
        match self {
            Self::Sha1 => SHA1_OID,
            Self::Sha256 => SHA256_OID,
        }
    }

    /// The digest size, in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// The `coreutils` name for this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

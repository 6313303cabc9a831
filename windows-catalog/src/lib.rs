//! A crate for extracting file digests from Windows catalog (`.cat`) files.
//!
//! A catalog is a PKCS#7 `SignedData` whose content is a Microsoft
//! Certificate Trust List. Each member of that list describes one file,
//! and carries attributes with (among other things) the file's name and
//! its digest. This crate walks that structure and produces
//! [`CatalogEntry`] values that render as `sha256sum`-style lines.
//!
//! ```no_run
//! use windows_catalog::CatalogTrustList;
//!
//! let file = std::fs::File::open("nv_disp.cat").unwrap();
//! let catalog = CatalogTrustList::from_der(file).unwrap();
//! for entry in catalog.entries().unwrap() {
//!     println!("{entry}");
//! }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_docs)]
#![allow(clippy::redundant_field_names)]
#![forbid(unsafe_code)]

use std::io::Read;
use std::string::FromUtf16Error;

use der::asn1::{Any, ObjectIdentifier, OctetString, Uint};
use der::{
    Decode, DecodeValue, Encode, EncodeValue, Enumerated, FixedTag, Header, Length, Reader,
    Sequence, SliceReader, Tag, Writer,
};
use pkcs7::PKCS_7_SIGNED_DATA_OID;
use spki::AlgorithmIdentifierOwned;
use thiserror::Error;
use x509_cert::ext::pkix::ExtendedKeyUsage;
use x509_cert::time::Time;

mod attr;
mod member;

pub use attr::{
    AttributeKind, CatalogNameValue, DigestAlgorithm, DigestInfo, MemberAttribute,
    MemberAttributeContent, NameValueTag, SpcIndirectData, FILENAME_NAME,
    MS_CATALOG_MEMBER_INFO2_OID, MS_CATALOG_MEMBER_INFO_OID, MS_CATALOG_NAME_VALUE_OID,
    SHA1_OID, SHA256_OID, SPC_CAB_DATA_OID, SPC_INDIRECT_DATA_OID,
};
pub use member::{decode_utf16le, CatalogEntry, CatalogMember, Resolution};

/// The object identifier for [`CatalogTrustList`] content.
pub const MS_CERT_TRUST_LIST_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.10.1");

/// The subject usage that marks a trust list as a catalog.
pub const MS_CATALOG_LIST_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.12.1.1");

/// The marker placed between digest and filename, denoting a binary-mode checksum.
pub const BINARY_MARKER: char = '*';

/// Possible errors while parsing a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// I/O errors.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Invalid DER.
    #[error("bad DER encoding: {0}")]
    Der(#[from] der::Error),

    /// Valid PKCS#7, but the wrong `content-type`.
    #[error("bad PKCS#7 content-type: expected SignedData ({PKCS_7_SIGNED_DATA_OID}), got {0}")]
    ContentType(ObjectIdentifier),

    /// Valid PKCS#7, but no encapsulated `signed-data`.
    #[error("missing SignedData encapsulated content")]
    MissingSignedData,

    /// Valid PKCS#7 with `signed-data`, but not a certificate trust list.
    #[error("bad SignedData ContentType: expected {MS_CERT_TRUST_LIST_OID}, got {0}")]
    Content(ObjectIdentifier),

    /// Valid PKCS#7 that claims to have a certificate trust list, but not present.
    #[error("missing SignedData inner content")]
    MissingSignedDataContent,

    /// A member attribute whose type this crate doesn't know how to decode.
    #[error("unsupported catalog member attribute: {0}")]
    UnknownAttribute(ObjectIdentifier),

    /// Text that should be UTF-16LE has an odd number of bytes.
    #[error("bad UTF-16LE text: odd length ({0} bytes)")]
    Utf16Length(usize),

    /// Text that should be UTF-16LE isn't.
    #[error("bad UTF-16LE text")]
    Utf16(#[from] FromUtf16Error),
}

/// A `SET OF` that keeps its elements in the order they were encoded.
///
/// [`der::asn1::SetOfVec`] enforces (or restores) DER ordering, which loses
/// the on-disk order that "last one wins" lookups depend on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderedSetOf<T>(pub Vec<T>);

impl<T> Default for OrderedSetOf<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> OrderedSetOf<T> {
    /// Returns an iterator over the set's elements, in encoded order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set has no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> From<Vec<T>> for OrderedSetOf<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<T> FixedTag for OrderedSetOf<T> {
    const TAG: Tag = Tag::Set;
}

impl<'a, T> DecodeValue<'a> for OrderedSetOf<T>
where
    T: Decode<'a>,
{
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        reader.read_nested(header.length, |reader| {
            let mut items = Vec::new();
            while !reader.is_finished() {
                items.push(T::decode(reader)?);
            }
            Ok(Self(items))
        })
    }
}

impl<T> EncodeValue for OrderedSetOf<T>
where
    T: Encode,
{
    fn value_len(&self) -> der::Result<Length> {
        self.0
            .iter()
            .try_fold(Length::ZERO, |len, item| len + item.encoded_len()?)
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        for item in &self.0 {
            item.encode(writer)?;
        }
        Ok(())
    }
}

/// ```asn1
/// ContentInfo ::= SEQUENCE {
///   contentType ContentType,
///   content [0] EXPLICIT ANY DEFINED BY contentType OPTIONAL
/// }
/// ```
///
/// Used for both the outer PKCS#7 envelope and the content inside `SignedData`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ContentInfo {
    /// What `content` holds.
    pub content_type: ObjectIdentifier,

    /// The content itself, still encoded.
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub content: Option<Any>,
}

/// PKCS#7 `SignedData`, with everything but the content left undecoded.
///
/// ```asn1
/// SignedData ::= SEQUENCE {
///   version Version,
///   digestAlgorithms DigestAlgorithmIdentifiers,
///   contentInfo ContentInfo,
///   certificates [0] IMPLICIT ExtendedCertificatesAndCertificates OPTIONAL,
///   crls [1] IMPLICIT CertificateRevocationLists OPTIONAL,
///   signerInfos SignerInfos
/// }
/// ```
///
/// Nothing here checks signatures, so the certificates and signer infos
/// are carried as raw DER.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct SignedData {
    /// Syntax version.
    pub version: Any,

    /// `SET OF DigestAlgorithmIdentifier`.
    pub digest_algorithms: Any,

    /// The signed content.
    pub content_info: ContentInfo,

    /// Signing certificates.
    #[asn1(context_specific = "0", optional = "true", tag_mode = "IMPLICIT")]
    pub certificates: Option<OrderedSetOf<Any>>,

    /// Revocation lists.
    #[asn1(context_specific = "1", optional = "true", tag_mode = "IMPLICIT")]
    pub crls: Option<OrderedSetOf<Any>>,

    /// `SET OF SignerInfo`.
    pub signer_infos: Any,
}

/// Version identifier for [`CatalogTrustList`].
///
/// ```asn1
/// CTLVersion ::= INTEGER {v1(0)}
/// ```
#[derive(Clone, Debug, Copy, PartialEq, Eq, Enumerated)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
#[derive(Default)]
pub enum CtlVersion {
    /// CtlVersion 1 (default)
    #[default]
    V1 = 0,
}

/// NOTE: MS calls X.509's [`ExtendedKeyUsage`] "`EnhancedKeyUsage`".
/// Catalogs list [`MS_CATALOG_LIST_OID`] here.
///
/// ```asn1
/// SubjectUsage ::= EnhancedKeyUsage
/// ```
pub type SubjectUsage = ExtendedKeyUsage;

/// ```asn1
/// ListIdentifier ::= OCTETSTRING
/// ```
pub type ListIdentifier = OctetString;

/// The certificate trust list at the heart of a catalog.
///
/// From [MS-CAESO], pages 47-48, with the trusted subjects being catalog
/// members:
///
/// ```asn1
/// CertificateTrustList ::= SEQUENCE {
///   version CTLVersion DEFAULT v1,
///   subjectUsage SubjectUsage,
///   listIdentifier ListIdentifier OPTIONAL,
///   sequenceNumber HUGEINTEGER OPTIONAL,
///   ctlThisUpdate ChoiceOfTime,
///   ctlNextUpdate ChoiceOfTime OPTIONAL,
///   subjectAlgorithm AlgorithmIdentifier,
///   trustedSubjects TrustedSubjects OPTIONAL,
///   ctlExtensions [0] EXPLICIT Extensions OPTIONAL
/// }
/// ```
///
/// [MS-CAESO]: https://yossarian.net/junk/hard_to_find/ms-caeso-v20090709.pdf
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct CatalogTrustList {
    /// This trust list's version. The default version is 1.
    #[asn1(default = "Default::default")]
    pub version: CtlVersion,

    /// X.509-style usage.
    pub subject_usage: SubjectUsage,

    /// For catalogs, a random identifier chosen by the catalog tool.
    pub list_identifier: Option<ListIdentifier>,

    /// Some kind of sequence number; purpose unknown.
    pub sequence_number: Option<Uint>,

    /// X.509-style time for when this catalog was produced.
    pub this_update: Time,

    /// X.509-style time for when the next catalog will be produced.
    pub next_update: Option<Time>,

    /// Identifies the member layout (catalog list member, v1 or v2).
    pub subject_algorithm: AlgorithmIdentifierOwned,

    /// The members of this catalog.
    pub members: Option<Vec<CatalogMember>>,

    /// Catalog-wide attributes.
    #[asn1(context_specific = "0", optional = "true", tag_mode = "EXPLICIT")]
    pub ctl_extensions: Option<Any>,
}

impl CatalogTrustList {
    /// Load a `CatalogTrustList` from the given source, which is expected to be a DER-encoded
    /// PKCS#7 stream.
    pub fn from_der<R: Read>(mut source: R) -> Result<Self, CatalogError> {
        let mut der = vec![];
        source.read_to_end(&mut der)?;

        Self::from_der_bytes(&der)
    }

    /// Load a `CatalogTrustList` from a DER-encoded PKCS#7 buffer.
    ///
    /// Anything after the PKCS#7 envelope (e.g. signing tool padding) is ignored.
    pub fn from_der_bytes(der: &[u8]) -> Result<Self, CatalogError> {
        let mut reader = SliceReader::new(der)?;
        let body = ContentInfo::decode(&mut reader)?;
        if !reader.is_finished() {
            log::debug!(
                "ignoring {} trailing byte(s) after the PKCS#7 envelope",
                reader.remaining_len()
            );
        }

        if body.content_type != PKCS_7_SIGNED_DATA_OID {
            return Err(CatalogError::ContentType(body.content_type));
        }

        let Some(content) = body.content else {
            return Err(CatalogError::MissingSignedData);
        };
        let signed_data: SignedData = content.decode_as()?;
        log::debug!(
            "unwrapped SignedData with {} certificate(s)",
            signed_data.certificates.as_ref().map_or(0, OrderedSetOf::len)
        );

        // Our actual SignedData content should be a MS-specific `certTrustList`.
        let inner = signed_data.content_info;
        if inner.content_type != MS_CERT_TRUST_LIST_OID {
            return Err(CatalogError::Content(inner.content_type));
        }

        let Some(content) = inner.content else {
            return Err(CatalogError::MissingSignedDataContent);
        };

        let ctl: Self = content.decode_as()?;
        log::debug!(
            "decoded trust list: {} member(s), subject algorithm {}",
            ctl.members().count(),
            ctl.subject_algorithm.oid
        );

        Ok(ctl)
    }

    /// Returns `true` if this trust list declares itself a catalog.
    pub fn is_catalog_list(&self) -> bool {
        self.subject_usage.0.contains(&MS_CATALOG_LIST_OID)
    }

    /// Returns an iterator over this catalog's members, in encoded order.
    pub fn members(&self) -> impl Iterator<Item = &CatalogMember> {
        self.members.iter().flatten()
    }

    /// Resolves every member, returning one [`CatalogEntry`] per member that has
    /// both a filename and a usable digest, in member order.
    ///
    /// Fails on the first malformed member; no entries are returned in that case.
    pub fn entries(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.members()
            .map(CatalogMember::resolve)
            .collect::<Result<Vec<_>, _>>()
            .map(|resolved| resolved.into_iter().flatten().collect())
    }
}

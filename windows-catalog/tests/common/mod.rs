//! Builders for synthetic catalogs.

#![allow(dead_code)]

use std::time::Duration;

use der::asn1::{Any, BmpString, ObjectIdentifier, OctetString, UtcTime};
use der::{Decode, Encode, Tag};
use spki::AlgorithmIdentifierOwned;
use windows_catalog::{
    CatalogMember, CatalogNameValue, CatalogTrustList, ContentInfo, CtlVersion, DigestInfo,
    MemberAttribute, NameValueTag, SignedData, SpcIndirectData, MS_CATALOG_LIST_OID,
    MS_CATALOG_MEMBER_INFO2_OID, MS_CATALOG_NAME_VALUE_OID, MS_CERT_TRUST_LIST_OID,
    SPC_CAB_DATA_OID, SPC_INDIRECT_DATA_OID,
};
use x509_cert::ext::pkix::ExtendedKeyUsage;
use x509_cert::time::Time;

pub const PKCS7_SIGNED_DATA: &str = "1.2.840.113549.1.7.2";

pub fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

pub fn any<T: Encode>(value: &T) -> Any {
    Any::from_der(&value.to_der().unwrap()).unwrap()
}

/// A `Filename` (or other) name-value attribute.
pub fn name_value(name: &str, value: &str) -> MemberAttribute {
    let name_value = CatalogNameValue {
        name: NameValueTag::Bmp(BmpString::from_utf8(name).unwrap()),
        // CRYPTCAT_ATTR_AUTHENTICATED | CRYPTCAT_ATTR_NAMEASCII | CRYPTCAT_ATTR_DATAASCII
        flags: Any::new(Tag::Integer, vec![0x10, 0x01, 0x00, 0x01]).unwrap(),
        value: OctetString::new(utf16le(value)).unwrap(),
    };

    MemberAttribute {
        oid: MS_CATALOG_NAME_VALUE_OID,
        values: vec![any(&name_value)].into(),
    }
}

/// An indirect data attribute with a flat-file digest.
pub fn cab_digest(algorithm: &str, digest: &[u8]) -> MemberAttribute {
    indirect_data(SPC_CAB_DATA_OID, algorithm, digest)
}

pub fn indirect_data(data: ObjectIdentifier, algorithm: &str, digest: &[u8]) -> MemberAttribute {
    let indirect_data = SpcIndirectData {
        data: AlgorithmIdentifierOwned {
            oid: data,
            parameters: None,
        },
        message_digest: DigestInfo {
            digest_algorithm: AlgorithmIdentifierOwned {
                oid: ObjectIdentifier::new_unwrap(algorithm),
                parameters: Some(Any::new(Tag::Null, Vec::new()).unwrap()),
            },
            digest: OctetString::new(digest.to_vec()).unwrap(),
        },
    };

    MemberAttribute {
        oid: SPC_INDIRECT_DATA_OID,
        values: vec![any(&indirect_data)].into(),
    }
}

/// A member info attribute, with a GUID-ish payload nothing should look at.
pub fn member_info() -> MemberAttribute {
    MemberAttribute {
        oid: MS_CATALOG_MEMBER_INFO2_OID,
        values: vec![Any::new(Tag::Sequence, vec![0x02, 0x01, 0x00]).unwrap()].into(),
    }
}

pub fn member(tag: &str, attributes: Vec<MemberAttribute>) -> CatalogMember {
    CatalogMember::new(OctetString::new(utf16le(tag)).unwrap(), attributes)
}

pub fn trust_list(members: Vec<CatalogMember>) -> CatalogTrustList {
    CatalogTrustList {
        version: CtlVersion::V1,
        subject_usage: ExtendedKeyUsage(vec![MS_CATALOG_LIST_OID]),
        list_identifier: Some(OctetString::new(vec![0x5A; 16]).unwrap()),
        sequence_number: None,
        this_update: Time::UtcTime(
            UtcTime::from_unix_duration(Duration::from_secs(1_700_000_000)).unwrap(),
        ),
        next_update: None,
        subject_algorithm: AlgorithmIdentifierOwned {
            oid: ObjectIdentifier::new_unwrap("1.3.6.1.4.1.311.12.1.2"),
            parameters: None,
        },
        members: Some(members),
        ctl_extensions: None,
    }
}

/// Wraps an already-encoded inner content in `SignedData` and an outer `ContentInfo`.
pub fn envelope(outer_type: &str, inner_type: ObjectIdentifier, inner: Any) -> Vec<u8> {
    let signed_data = SignedData {
        version: Any::new(Tag::Integer, vec![0x01]).unwrap(),
        digest_algorithms: Any::new(Tag::Set, Vec::new()).unwrap(),
        content_info: ContentInfo {
            content_type: inner_type,
            content: Some(inner),
        },
        certificates: None,
        crls: None,
        signer_infos: Any::new(Tag::Set, Vec::new()).unwrap(),
    };

    ContentInfo {
        content_type: ObjectIdentifier::new_unwrap(outer_type),
        content: Some(any(&signed_data)),
    }
    .to_der()
    .unwrap()
}

/// A complete, DER-encoded catalog holding `members`.
pub fn catalog(members: Vec<CatalogMember>) -> Vec<u8> {
    envelope(
        PKCS7_SIGNED_DATA,
        MS_CERT_TRUST_LIST_OID,
        any(&trust_list(members)),
    )
}

//! Type for the legacy Netscape certificate type extension

use const_oid::AssociatedOid;
use der::{
    asn1::ObjectIdentifier, DecodeValue, EncodeValue, FixedTag, Header, Length, Reader, Tag,
    Writer,
};
use flagset::{flags, FlagSet};

use crate::util::oids::NETSCAPE_CERT_TYPE;

flags! {
    /// Bits of the Netscape certificate type BIT STRING. Bit 0 is the most significant bit of the
    /// first content octet.
    #[allow(missing_docs)]
    pub enum NsCertTypes: u8 {
        SslClient = 1 << 0,
        SslServer = 1 << 1,
        Email = 1 << 2,
        ObjectSigning = 1 << 3,
        Reserved = 1 << 4,
        SslCa = 1 << 5,
        EmailCa = 1 << 6,
        ObjectSigningCa = 1 << 7,
    }
}

/// Netscape certificate type extension.
///
/// This extension is identified by the [`NETSCAPE_CERT_TYPE`] OID.
///
/// ```text
/// NetscapeCertType ::= BIT STRING {
///      sslClient        (0),
///      sslServer        (1),
///      smime            (2),
///      objectSigning    (3),
///      reserved         (4),
///      sslCA            (5),
///      smimeCA          (6),
///      objectSigningCA  (7) }
/// ```
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NsCertType(pub FlagSet<NsCertTypes>);

impl NsCertType {
    /// Returns true if any of the CA bits is set
    pub fn asserts_ca(&self) -> bool {
        !(self.0 & (NsCertTypes::SslCa | NsCertTypes::EmailCa | NsCertTypes::ObjectSigningCa))
            .is_empty()
    }
}

impl AssociatedOid for NsCertType {
    const OID: ObjectIdentifier = NETSCAPE_CERT_TYPE;
}

impl FixedTag for NsCertType {
    const TAG: Tag = Tag::BitString;
}

impl<'a> DecodeValue<'a> for NsCertType {
    fn decode_value<R: Reader<'a>>(reader: &mut R, header: Header) -> der::Result<Self> {
        Ok(NsCertType(FlagSet::<NsCertTypes>::decode_value(
            reader, header,
        )?))
    }
}

impl EncodeValue for NsCertType {
    fn value_len(&self) -> der::Result<Length> {
        self.0.value_len()
    }

    fn encode_value(&self, writer: &mut impl Writer) -> der::Result<()> {
        self.0.encode_value(writer)
    }
}

#[test]
fn ns_cert_type_encoding() {
    use der::{Decode, Encode};
    use hex_literal::hex;

    // sslClient and smime: 1010 0000 with five unused bits
    let ct = NsCertType(NsCertTypes::SslClient | NsCertTypes::Email);
    let enc = ct.to_der().unwrap();
    assert_eq!(enc, hex!("030205A0"));
    let dec = NsCertType::from_der(&enc).unwrap();
    assert_eq!(ct, dec);
    assert!(!dec.asserts_ca());

    let ca = NsCertType(NsCertTypes::SslCa.into());
    assert!(ca.asserts_ca());
}

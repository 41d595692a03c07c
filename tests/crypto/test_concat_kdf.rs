//! Concat KDF tests
//!
//! Uses the ECDH-ES key agreement example of RFC 7518 appendix C.

use vau_tunnel::crypto::base64url::base64url_encode;
use vau_tunnel::crypto::concat_kdf::{concat_kdf, OtherInfo};

const RFC7518_Z: &str = "9e56d91d817135d372834283bf84269cfb316ea3da806a48f6daa7798cfe90c4";

#[test]
fn test_rfc7518_appendix_c() {
    let z = hex::decode(RFC7518_Z).unwrap();
    let info = OtherInfo::direct("A128GCM", 128).with_party_info(b"Alice".to_vec(), b"Bob".to_vec());

    let key = concat_kdf(&z, &info).unwrap();
    assert_eq!(base64url_encode(key.as_slice()), "VqqN6vgjbSBcIijNcacQGg");
}

#[test]
fn test_other_info_with_party_info() {
    let info = OtherInfo::direct("A128GCM", 128).with_party_info(b"Alice".to_vec(), b"Bob".to_vec());
    assert_eq!(
        hex::encode(info.to_bytes()),
        "000000074131323847434d00000005416c69636500000003426f6200000080"
    );
}

#[test]
fn test_two_rounds() {
    let z = hex::decode(RFC7518_Z).unwrap();
    let key = concat_kdf(&z, &OtherInfo::direct("A256GCM", 512)).unwrap();
    assert_eq!(
        hex::encode(key.as_slice()),
        "ee42288ea7660b05e0ad7a42c8d95a63421f641de8d4f2d882b32e35f848b770\
         d4f968e18f5ff33608a0c50c4475f6ded884a97680bf562417c5dc55433263f5"
    );
}

//! Signing capability over stored buffers.
//!
//! The core only exposes `Buffer` and `Session` to implementations; it
//! never calls into them.

use crate::buffer::Buffer;

pub trait SignatureCapability {
    type Signature;

    fn sign(&self, buffer: &Buffer) -> Self::Signature;

    fn verify(&self, buffer: &Buffer, signature: &Self::Signature) -> bool;
}

#[cfg(feature = "signature")]
pub use keyed::{BufferSignature, KeyedDigestSigner};

#[cfg(feature = "signature")]
mod keyed {
    use blake3::Hash;
    use serde::{Deserialize, Deserializer, Serialize};
    use zeroize::Zeroizing;

    use super::SignatureCapability;
    use crate::buffer::Buffer;
    use crate::persist::to_bytes;
    use crate::session::Session;
    use crate::versioning::{BUFFER_SIGNATURE_VERSION, expect_version};

    const SIGNER_CONTEXT: &str = "fore-core 2024 keyed buffer digest v1";

    #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
    pub struct BufferSignature {
        pub version: u16,
        pub tag: [u8; 32],
    }

    impl<'de> Deserialize<'de> for BufferSignature {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            #[derive(Deserialize)]
            struct Helper {
                version: u16,
                tag: [u8; 32],
            }
            let helper = Helper::deserialize(deserializer)?;
            expect_version::<D::Error>(
                helper.version,
                BUFFER_SIGNATURE_VERSION,
                "BufferSignature",
            )?;
            Ok(Self {
                version: helper.version,
                tag: helper.tag,
            })
        }
    }

    /// BLAKE3 keyed digest over the persisted form of a buffer.
    pub struct KeyedDigestSigner {
        key: Zeroizing<[u8; 32]>,
    }

    impl KeyedDigestSigner {
        pub fn for_session(session: &Session) -> Self {
            Self {
                key: session.derive_subkey(SIGNER_CONTEXT),
            }
        }

        fn digest(&self, buffer: &Buffer) -> Hash {
            blake3::keyed_hash(&self.key, &to_bytes(buffer))
        }
    }

    impl SignatureCapability for KeyedDigestSigner {
        type Signature = BufferSignature;

        fn sign(&self, buffer: &Buffer) -> BufferSignature {
            BufferSignature {
                version: BUFFER_SIGNATURE_VERSION,
                tag: *self.digest(buffer).as_bytes(),
            }
        }

        fn verify(&self, buffer: &Buffer, signature: &BufferSignature) -> bool {
            if signature.version != BUFFER_SIGNATURE_VERSION {
                return false;
            }
            // Hash equality is constant time
            self.digest(buffer) == Hash::from(signature.tag)
        }
    }

}

//! Table definition macros.

#[macro_export]
macro_rules! define_table_without_codec {
    ($(#[$docs:meta])+ ( $table_name:ident, $tree:literal ) $key:ty => $value:ty) => {
        $(#[$docs])+
        ///
        #[doc = concat!("Takes [`", stringify!($key), "`] as a key and returns [`", stringify!($value), "`]")]
        #[derive(Clone, Copy, Debug, Default)]
        pub struct $table_name;

        impl ::typed_sled::Schema for $table_name {
            const TREE_NAME: ::typed_sled::schema::TreeName =
                ::typed_sled::schema::TreeName($tree);
            type Key = $key;
            type Value = $value;
        }

        impl $table_name {
            pub(crate) const fn tree_name() -> &'static str {
                $tree
            }
        }

        impl ::std::fmt::Display for $table_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::core::write!(f, "{}", $tree)
            }
        }
    };
}

/// Implements a key codec for identifier newtypes stored as their raw
/// fixed-width bytes, so the sled key order matches the id order.
#[macro_export]
macro_rules! impl_id_key_codec {
    ($table_name:ident, $key:ty, $len:literal) => {
        impl ::typed_sled::codec::KeyCodec<$table_name> for $key {
            fn encode_key(
                &self,
            ) -> ::std::result::Result<::std::vec::Vec<u8>, ::typed_sled::codec::CodecError> {
                Ok(self.as_bytes().to_vec())
            }

            fn decode_key(
                data: &[u8],
            ) -> ::std::result::Result<Self, ::typed_sled::codec::CodecError> {
                let bytes: [u8; $len] = data.try_into().map_err(|_| {
                    ::typed_sled::codec::CodecError::InvalidKeyLength {
                        schema: $table_name::tree_name(),
                        expected: $len,
                        actual: data.len(),
                    }
                })?;
                Ok(<$key>::new(bytes))
            }
        }
    };
}

/// Implements the default borsh value codec for a table.
#[macro_export]
macro_rules! impl_borsh_value_codec {
    ($table_name:ident, $value:ty) => {
        impl ::typed_sled::codec::ValueCodec<$table_name> for $value {
            fn encode_value(
                &self,
            ) -> ::std::result::Result<::std::vec::Vec<u8>, ::typed_sled::codec::CodecError> {
                ::borsh::to_vec(self).map_err(|err| {
                    ::typed_sled::codec::CodecError::SerializationFailed {
                        schema: $table_name::tree_name(),
                        source: err,
                    }
                })
            }

            fn decode_value(
                data: &[u8],
            ) -> ::std::result::Result<Self, ::typed_sled::codec::CodecError> {
                ::borsh::from_slice(data).map_err(|err| {
                    ::typed_sled::codec::CodecError::DeserializationFailed {
                        schema: $table_name::tree_name(),
                        source: err,
                    }
                })
            }
        }
    };
}

/// Table with a raw 16-byte identifier key and a borsh value.
#[macro_export]
macro_rules! define_table_with_id_key {
    ($(#[$docs:meta])+ ( $table_name:ident, $tree:literal ) $key:ty => $value:ty) => {
        $crate::define_table_without_codec!($(#[$docs])+ ( $table_name, $tree ) $key => $value);

        $crate::impl_id_key_codec!($table_name, $key, 16);
        $crate::impl_borsh_value_codec!($table_name, $value);
    };
}

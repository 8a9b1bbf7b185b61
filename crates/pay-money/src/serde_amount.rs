//! Serialize minor-unit amounts as decimal integer strings.
//!
//! Use with `#[serde(with = "pay_money::serde_amount")]` on `BigInt` fields and
//! `#[serde(with = "pay_money::serde_amount::option")]` on `Option<BigInt>`.

use num_bigint::BigInt;
use serde::{de, Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(v: &BigInt, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&v.to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BigInt, D::Error> {
    let raw = String::deserialize(d)?;
    raw.parse::<BigInt>().map_err(de::Error::custom)
}

pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Option<BigInt>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(n) => s.serialize_some(&n.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<BigInt>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        raw.map(|r| r.parse::<BigInt>().map_err(de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "crate::serde_amount")]
        amount: BigInt,
        #[serde(default, with = "crate::serde_amount::option")]
        maybe: Option<BigInt>,
    }

    #[test]
    fn amounts_are_strings_on_the_wire() {
        let h = Holder {
            amount: "123456789012345678901234567890".parse().unwrap(),
            maybe: None,
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"amount":"123456789012345678901234567890","maybe":null}"#);
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}

//! The seven registration verbs as a typed enum.
//!
//! These are the verb pairs the service-server contract exposes
//! (get/put/post/del/patch/opts/head). Anything outside this set never
//! reaches a handler — the backend answers `404 Not Found` before routing.

use std::fmt;
use std::str::FromStr;

/// A registerable HTTP verb.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Verb {
    Get,
    Put,
    Post,
    Del,
    Patch,
    Opts,
    Head,
}

impl Verb {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get   => "GET",
            Self::Put   => "PUT",
            Self::Post  => "POST",
            Self::Del   => "DELETE",
            Self::Patch => "PATCH",
            Self::Opts  => "OPTIONS",
            Self::Head  => "HEAD",
        }
    }

    /// Maps a wire-level method onto a registerable verb, if it is one.
    pub(crate) fn from_method(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::GET     => Some(Self::Get),
            http::Method::PUT     => Some(Self::Put),
            http::Method::POST    => Some(Self::Post),
            http::Method::DELETE  => Some(Self::Del),
            http::Method::PATCH   => Some(Self::Patch),
            http::Method::OPTIONS => Some(Self::Opts),
            http::Method::HEAD    => Some(Self::Head),
            _ => None,
        }
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET"     => Ok(Self::Get),
            "PUT"     => Ok(Self::Put),
            "POST"    => Ok(Self::Post),
            "DELETE"  => Ok(Self::Del),
            "PATCH"   => Ok(Self::Patch),
            "OPTIONS" => Ok(Self::Opts),
            "HEAD"    => Ok(Self::Head),
            _         => Err(()),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_representation_round_trips() {
        for verb in [
            Verb::Get, Verb::Put, Verb::Post, Verb::Del,
            Verb::Patch, Verb::Opts, Verb::Head,
        ] {
            assert_eq!(verb.as_str().parse::<Verb>(), Ok(verb));
        }
    }

    #[test]
    fn lowercase_and_unknown_methods_are_rejected() {
        assert!("get".parse::<Verb>().is_err());
        assert!("TRACE".parse::<Verb>().is_err());
        assert!("".parse::<Verb>().is_err());
    }

    #[test]
    fn non_contract_wire_methods_map_to_none() {
        assert_eq!(Verb::from_method(&http::Method::TRACE), None);
        assert_eq!(Verb::from_method(&http::Method::DELETE), Some(Verb::Del));
    }
}

pub mod gocover;

use crate::error::Result;
use crate::model::Profile;

/// Every profile format parser implements this trait.
pub trait Parser {
    /// Parse the input bytes into coverage profiles. `source` names the
    /// input in error messages.
    fn parse(&self, source: &str, input: &[u8]) -> Result<Vec<Profile>>;
}

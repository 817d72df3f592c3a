//! The contract between the compile driver and a model output.

use crate::compiler::Toolkit;
use crate::error::Result;
use logipard_types::FdomName;

/// Receives model mutations from the compile driver, in order
///
/// All names are canonical and alias-resolved. `source_file` is always the
/// top-level input being compiled, even for content that came in through an
/// include.
pub trait ModelWriter {
    fn open_model_output(&mut self) -> Result<()>;

    fn close_model_output(&mut self) -> Result<()>;

    /// Drop everything `source_file` contributed before it is compiled again
    fn invalidate_source_file(&mut self, source_file: &str, new_dependencies: &[String]) -> Result<()>;

    fn append_content(&mut self, target: &FdomName, content: &str, source_file: &str) -> Result<()>;

    /// Apply `tag` onto `target`
    fn tag_to(&mut self, tag: &FdomName, target: &FdomName, source_file: &str) -> Result<()>;

    fn append_ref(&mut self, target: &FdomName, ref_name: &FdomName, text: &str, source_file: &str) -> Result<()>;

    /// Handle a tag the driver does not know
    ///
    /// Nested markup in the tag body can be fed back to the driver through
    /// [`Toolkit::process_tag`], passing this writer along.
    fn process_custom_tag(
        &mut self,
        target: &FdomName,
        tag_name: &str,
        toolkit: &mut Toolkit<'_, '_>,
        source_file: &str,
    ) -> Result<()>;
}

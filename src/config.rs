//! Options controlling which post-MVP constructs an encode may emit.
use std::fmt;

/// A WebAssembly extension an instruction, segment or section may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    MutableGlobals,
    BulkMemory,
    ReferenceTypes,
    MultipleTables,
    MultipleMemories,
    SignExtension,
    SaturatingFloatToInt,
    MultiValue,
    Threads,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Feature::MutableGlobals => "mutable-globals",
            Feature::BulkMemory => "bulk-memory",
            Feature::ReferenceTypes => "reference-types",
            Feature::MultipleTables => "multiple-tables",
            Feature::MultipleMemories => "multiple-memories",
            Feature::SignExtension => "sign-extension",
            Feature::SaturatingFloatToInt => "saturating-float-to-int",
            Feature::MultiValue => "multi-value",
            Feature::Threads => "threads",
        })
    }
}

/// Per-encode configuration.
///
/// A construct requiring a disabled feature makes the encode fail. The
/// `custom_sections` and `debug_names` switches instead leave the respective
/// sections out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Mutable globals in imports and exports.
    pub mutable_globals: bool,
    pub bulk_memory: bool,
    pub reference_types: bool,
    pub multiple_tables: bool,
    pub multiple_memories: bool,
    pub sign_extension: bool,
    pub saturating_float_to_int: bool,
    pub multi_value: bool,
    pub threads: bool,

    /// Emit custom sections other than the `name` section.
    pub custom_sections: bool,
    /// Emit the `name` section.
    pub debug_names: bool,
    /// Validate the module before writing it.
    pub validate: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            mutable_globals: true,
            bulk_memory: true,
            reference_types: true,
            multiple_tables: true,
            multiple_memories: true,
            sign_extension: true,
            saturating_float_to_int: true,
            multi_value: true,
            threads: true,
            custom_sections: true,
            debug_names: true,
            validate: true,
        }
    }
}

impl EncodeOptions {
    /// The WebAssembly 1.0 feature set.
    pub fn mvp() -> Self {
        Self {
            mutable_globals: false,
            bulk_memory: false,
            reference_types: false,
            multiple_tables: false,
            multiple_memories: false,
            sign_extension: false,
            saturating_float_to_int: false,
            multi_value: false,
            threads: false,
            ..Self::default()
        }
    }

    pub fn enables(&self, feature: Feature) -> bool {
        match feature {
            Feature::MutableGlobals => self.mutable_globals,
            Feature::BulkMemory => self.bulk_memory,
            Feature::ReferenceTypes => self.reference_types,
            Feature::MultipleTables => self.multiple_tables,
            Feature::MultipleMemories => self.multiple_memories,
            Feature::SignExtension => self.sign_extension,
            Feature::SaturatingFloatToInt => self.saturating_float_to_int,
            Feature::MultiValue => self.multi_value,
            Feature::Threads => self.threads,
        }
    }

    pub fn with(mut self, feature: Feature, enabled: bool) -> Self {
        *match feature {
            Feature::MutableGlobals => &mut self.mutable_globals,
            Feature::BulkMemory => &mut self.bulk_memory,
            Feature::ReferenceTypes => &mut self.reference_types,
            Feature::MultipleTables => &mut self.multiple_tables,
            Feature::MultipleMemories => &mut self.multiple_memories,
            Feature::SignExtension => &mut self.sign_extension,
            Feature::SaturatingFloatToInt => &mut self.saturating_float_to_int,
            Feature::MultiValue => &mut self.multi_value,
            Feature::Threads => &mut self.threads,
        } = enabled;
        self
    }
}

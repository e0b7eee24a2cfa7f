pub mod cache;
pub mod snapshot;
pub mod tables;

pub use cache::{FileRuleSource, PolicyCache, RuleDocuments, RuleSource};
pub use snapshot::{InstitutionTable, MappingTable, PolicySnapshot, SettingsTable};
pub use tables::{
	InstitutionDocument, InstitutionRow, MappingDocument, MappingRow, SettingRow, SettingValue,
	SettingsDocument,
};

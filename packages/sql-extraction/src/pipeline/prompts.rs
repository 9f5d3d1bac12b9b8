//! Prompts for the extraction and consolidation pipelines.
//!
//! Templates use `{placeholder}` markers filled with `str::replace`, so braces in
//! the JSON schemas and in the submitted SQL need no escaping. `{sql}` is always
//! substituted last so placeholder-like text inside a script is left alone.

use serde::Deserialize;

/// Separates the JSON model from the markdown report in a combined response.
pub const REPORT_MARKER: &str = "===REPORT_MARKDOWN===";

/// System instruction sent with every extraction call.
pub const SYSTEM_INSTRUCTION: &str = r#"You are an expert data architect specializing in reverse-engineering data models from SQL code.
Your sole purpose is to analyze the structure of SQL scripts to identify entities (tables),
attributes (columns), relationships (joins) and, when asked, data lineage. Ignore the business
context and focus exclusively on the technical DDL and DML structure to build an accurate data model."#;

/// System instruction for the merge prompt.
pub const CONSOLIDATION_SYSTEM_INSTRUCTION: &str =
    "You are a data architect consolidating per-script data models into a business-level view.";

/// Main extraction template.
pub const DATA_MODEL_PROMPT: &str = r#"Analyze the provided SQL script and extract a structured **Data Model**: the **entities (tables)**, their **attributes (columns)** and the **relationships (joins)** between them.

**INSTRUCTIONS:**
1. **Focus on the data model.** Do NOT include procedural steps, CASE logic or operational commands (DELETE, COLLECT STATS).
2. **Prefer DDL for schema.** Take column names and data types from `CREATE TABLE` statements.
3. **Capture every join.** Record the join type and each condition of the `ON` clause.
4. **Infer entities from usage.** A table without DDL still exists if it appears in `FROM` or `JOIN`; infer its role from that usage.
{role_rules}{lineage_rules}
Return the complete output as a single JSON object with this structure:

{
  "job_metadata": {
    "job_name": "Name taken from script comments or the file name",
    "default_database": "Database set by the DATABASE command"
  },
  "entities": [
    {
      "entity_name": "Table name (e.g., FR36_TXN_REPORT_SUMMARY)",
      "database": "Database or project holding the table",
      "entity_role": "SOURCE_TABLE, TARGET_TABLE, WORK_TABLE or LOOKUP_TABLE",
      "creation_source": "Where the schema came from (e.g., 'CREATE TABLE DDL', 'Inferred from SELECT')",
      "primary_key": ["Columns of the unique primary index"],
      "attributes": [
        {
          "attribute_name": "Column name (e.g., RETAIL_AM)",
          "data_type": "Data type from DDL (e.g., DECIMAL(15,2))",
          "is_nullable": true
        }
      ]
    }
  ],
  "relationships": [
    {
      "type": "Join type (INNER, LEFT, CROSS)",
      "left_entity": "Full name of the left table",
      "right_entity": "Full name of the right table",
      "join_conditions": ["One condition per entry (e.g., 'A.ACCOUNT_KEY = B.ACCOUNT_KEY')"]
    }
  ]{lineage_schema}
}
{report_instructions}
SQL:
{sql}
"#;

const ROLE_RULES: &str = r#"5. **Classify entity roles.** Tables whose names start with `{work_table_prefix}` or that are VOLATILE/temporary are WORK_TABLE. Tables only read are SOURCE_TABLE. Tables written by INSERT, UPDATE or MERGE are TARGET_TABLE. Small reference tables used only in joins are LOOKUP_TABLE.
"#;

const LINEAGE_RULES: &str = r#"6. **Trace lineage.** For every INSERT, UPDATE or MERGE add a `data_flow` entry naming the target, its sources and, per target column, the source columns and the transformation expression.
"#;

const LINEAGE_SCHEMA: &str = r#",
  "data_flow": [
    {
      "operation_type": "INSERT, UPDATE or MERGE",
      "target_entity": "Table being written",
      "source_entities": ["Tables read by the statement"],
      "attribute_mappings": [
        {
          "target_attribute": "Target column",
          "source_attributes": ["Source columns"],
          "source_expression": "Transformation expression, verbatim"
        }
      ]
    }
  ]"#;

const COMBINED_REPORT_INSTRUCTIONS: &str = r#"
After the JSON object, output a line containing exactly `===REPORT_MARKDOWN===` followed by a markdown report of the same model: one table listing entities (name, role, creation source), one table per entity listing its attributes, and one table listing relationships. Output nothing else.
"#;

/// Template for the separate markdown report call.
pub const REPORT_PROMPT: &str = r#"Analyze the provided SQL script and write a markdown report of its data model.

Include:
- A table of entities with columns: Entity, Database, Role, Creation Source
- For each entity, a table of attributes with columns: Attribute, Data Type, Nullable, Primary Key
- A table of relationships with columns: Join Type, Left Entity, Right Entity, Conditions

Tables whose names start with `{work_table_prefix}` are work tables. Output only the markdown.

SQL:
{sql}
"#;

/// Merge prompt applied to each skimmed record.
pub const CONSOLIDATION_PROMPT: &str = r#"Given the following JSON from a SQL script analysis, identify the core entities and their relationships.

**CRITICAL INSTRUCTIONS:**
1. **Ignore audit and metadata.** Exclude entities for auditing, logging or metadata (names containing `_LOG`, `_AUDIT`, `_ERR`, `_TMP`, `_WORK`, or volatile tables). Keep core business entities.
2. **Entities and relationships only.** Do NOT include attributes.
3. **Clean output.** Return a single JSON object with only `entities` and `relationships`, no explanations.

**Output JSON Structure:**
{
  "entities": [
    {"name": "CoreBusinessEntityName"}
  ],
  "relationships": [
    {"from": "EntityA", "to": "EntityB", "type": "relationship_type", "details": "..."}
  ]
}

**Input JSON:**
{input}
"#;

/// Which schema the extraction prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptVariant {
    /// Entities, attributes and relationships
    #[default]
    DataModel,
    /// Data model plus a `data_flow` lineage section
    Lineage,
}

/// How the human-readable report is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// No report
    #[default]
    None,
    /// A second model call dedicated to the report
    Separate,
    /// One call emitting JSON, then [`REPORT_MARKER`], then markdown
    Combined,
}

/// Prompt selection for [`Extractor`](crate::Extractor).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub variant: PromptVariant,
    pub report: ReportMode,
    /// Name prefix that marks work tables
    pub work_table_prefix: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            variant: PromptVariant::default(),
            report: ReportMode::default(),
            work_table_prefix: "WRK_".to_string(),
        }
    }
}

impl PromptConfig {
    /// Render the extraction prompt for one script.
    pub fn extraction_prompt(&self, sql: &str) -> String {
        let (lineage_rules, lineage_schema) = match self.variant {
            PromptVariant::DataModel => ("", ""),
            PromptVariant::Lineage => (LINEAGE_RULES, LINEAGE_SCHEMA),
        };
        let report_instructions = match self.report {
            ReportMode::Combined => COMBINED_REPORT_INSTRUCTIONS,
            ReportMode::None | ReportMode::Separate => "",
        };

        DATA_MODEL_PROMPT
            .replace("{role_rules}", ROLE_RULES)
            .replace("{lineage_rules}", lineage_rules)
            .replace("{lineage_schema}", lineage_schema)
            .replace("{report_instructions}", report_instructions)
            .replace("{work_table_prefix}", &self.work_table_prefix)
            .replace("{sql}", sql)
    }

    /// Render the standalone report prompt used in [`ReportMode::Separate`].
    pub fn report_prompt(&self, sql: &str) -> String {
        REPORT_PROMPT
            .replace("{work_table_prefix}", &self.work_table_prefix)
            .replace("{sql}", sql)
    }
}

/// Render the merge prompt for one skimmed record.
pub fn format_consolidation_prompt(input: &str) -> String {
    CONSOLIDATION_PROMPT.replace("{input}", input)
}

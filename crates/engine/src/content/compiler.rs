use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use tracing::debug;

use super::database::{DefDatabase, EntityArchetype, EntityKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
}

#[derive(Debug, Clone)]
pub struct ContentCompileError {
    pub code: ContentErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ContentCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ContentCompileError {}

/// Compiles every `*.xml` file under `content_dir` (recursively, in sorted
/// relative-path order) into a database keyed by `defName`.
pub fn compile_def_database(content_dir: &Path) -> Result<DefDatabase, ContentCompileError> {
    let xml_files = collect_xml_files_sorted(content_dir)
        .map_err(|error| read_error(error.path, error.source))?;

    let mut merged = BTreeMap::<String, EntityArchetype>::new();
    let mut defined_in = HashMap::<String, PathBuf>::new();

    for xml_file in xml_files {
        let raw = fs::read_to_string(&xml_file)
            .map_err(|source_err| read_error(xml_file.clone(), source_err))?;
        let defs = parse_defs_document(&xml_file, &raw)?;
        debug!(file = %xml_file.display(), def_count = defs.len(), "defs_parsed");
        for def in defs {
            if let Some(previous) = defined_in.get(&def.def_name) {
                return Err(ContentCompileError {
                    code: ContentErrorCode::DuplicateDef,
                    message: format!(
                        "duplicate EntityDef '{}' (first defined in {})",
                        def.def_name,
                        previous.display()
                    ),
                    file_path: xml_file.clone(),
                    location: None,
                });
            }
            defined_in.insert(def.def_name.clone(), xml_file.clone());
            merged.insert(def.def_name.clone(), def);
        }
    }

    Ok(DefDatabase::from_entity_defs(merged.into_values().collect()))
}

struct DocContext<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl DocContext<'_, '_> {
    fn error_at(&self, code: ContentErrorCode, message: String, node: Node<'_, '_>) -> ContentCompileError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentCompileError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn required_text(
        &self,
        node: Node<'_, '_>,
        field_name: &str,
    ) -> Result<String, ContentCompileError> {
        let value = node.text().map(str::trim).unwrap_or_default().to_string();
        if value.is_empty() {
            return Err(self.error_at(
                ContentErrorCode::MissingField,
                format!("field <{}> must not be empty", field_name),
                node,
            ));
        }
        Ok(value)
    }

    fn non_negative_f32(
        &self,
        node: Node<'_, '_>,
        field_name: &str,
    ) -> Result<f32, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        let parsed = value.parse::<f32>().map_err(|_| {
            self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{} '{}' is not a valid number", field_name, value),
                node,
            )
        })?;
        if !parsed.is_finite() || parsed < 0.0 {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{} must be finite and >= 0", field_name),
                node,
            ));
        }
        Ok(parsed)
    }

    fn positive_f32(
        &self,
        node: Node<'_, '_>,
        field_name: &str,
    ) -> Result<f32, ContentCompileError> {
        let parsed = self.non_negative_f32(node, field_name)?;
        if parsed <= 0.0 {
            return Err(self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{} must be > 0", field_name),
                node,
            ));
        }
        Ok(parsed)
    }

    fn u32_value(&self, node: Node<'_, '_>, field_name: &str) -> Result<u32, ContentCompileError> {
        let value = self.required_text(node, field_name)?;
        value.parse::<u32>().map_err(|_| {
            self.error_at(
                ContentErrorCode::InvalidValue,
                format!("{} '{}' is not a non-negative integer", field_name, value),
                node,
            )
        })
    }
}

fn parse_defs_document(
    file_path: &Path,
    raw: &str,
) -> Result<Vec<EntityArchetype>, ContentCompileError> {
    let doc = Document::parse(raw).map_err(|error| ContentCompileError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let context = DocContext {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(context.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            root,
        ));
    }

    let mut defs = Vec::<EntityArchetype>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "EntityDef" {
            return Err(context.error_at(
                ContentErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; only <EntityDef> is supported",
                    child.tag_name().name()
                ),
                child,
            ));
        }
        defs.push(parse_entity_def(&context, child)?);
    }

    Ok(defs)
}

fn parse_entity_def(
    context: &DocContext<'_, '_>,
    node: Node<'_, '_>,
) -> Result<EntityArchetype, ContentCompileError> {
    let mut seen_fields = Vec::<String>::new();
    let mut def_name: Option<String> = None;
    let mut label: Option<String> = None;
    let mut kind: Option<EntityKind> = None;
    let mut def = EntityArchetype::new(String::new(), String::new(), EntityKind::Player);

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if seen_fields.contains(&field_name) {
            return Err(context.error_at(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <EntityDef>", field_name),
                field,
            ));
        }
        seen_fields.push(field_name.clone());

        match field_name.as_str() {
            "defName" => def_name = Some(context.required_text(field, "defName")?),
            "label" => label = Some(context.required_text(field, "label")?),
            "kind" => {
                let value = context.required_text(field, "kind")?;
                let parsed = EntityKind::parse(&value).ok_or_else(|| {
                    context.error_at(
                        ContentErrorCode::InvalidValue,
                        format!(
                            "invalid kind '{}'; allowed values: {}",
                            value,
                            EntityKind::ALLOWED
                        ),
                        field,
                    )
                })?;
                kind = Some(parsed);
            }
            "prompt" => def.prompt = Some(context.required_text(field, "prompt")?),
            "moveSpeed" => def.move_speed = Some(context.non_negative_f32(field, "moveSpeed")?),
            "sprintMultiplier" => {
                def.sprint_multiplier = Some(context.non_negative_f32(field, "sprintMultiplier")?)
            }
            "interactionDistance" => {
                def.interaction_distance =
                    Some(context.non_negative_f32(field, "interactionDistance")?)
            }
            "maxFuel" => def.max_fuel = Some(context.positive_f32(field, "maxFuel")?),
            "decayRate" => def.decay_rate = Some(context.non_negative_f32(field, "decayRate")?),
            "chopDuration" => {
                def.chop_duration = Some(context.non_negative_f32(field, "chopDuration")?)
            }
            "logDef" => def.log_def = Some(context.required_text(field, "logDef")?),
            "numberOfLogs" => def.number_of_logs = Some(context.u32_value(field, "numberOfLogs")?),
            "scatterRadius" => {
                def.scatter_radius = Some(context.non_negative_f32(field, "scatterRadius")?)
            }
            "fuelValue" => def.fuel_value = Some(context.non_negative_f32(field, "fuelValue")?),
            _ => {
                return Err(context.error_at(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <EntityDef>", field_name),
                    field,
                ))
            }
        }
    }

    let Some(def_name) = def_name else {
        return Err(missing_field(context, node, "defName"));
    };
    let Some(label) = label else {
        return Err(missing_field(context, node, "label"));
    };
    let Some(kind) = kind else {
        return Err(missing_field(context, node, "kind"));
    };

    def.def_name = def_name;
    def.label = label;
    def.kind = kind;
    Ok(def)
}

fn missing_field(
    context: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> ContentCompileError {
    context.error_at(
        ContentErrorCode::MissingField,
        format!("missing required field <{}> in <EntityDef>", field_name),
        node,
    )
}

struct ReadError {
    path: PathBuf,
    source: std::io::Error,
}

fn collect_xml_files_sorted(root: &Path) -> Result<Vec<PathBuf>, ReadError> {
    let mut files = Vec::<PathBuf>::new();
    collect_recursive(root, &mut files)?;
    files.sort_by_key(|path| normalize_rel_path(path.strip_prefix(root).unwrap_or(path)));
    Ok(files)
}

fn collect_recursive(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReadError> {
    let entries = fs::read_dir(current).map_err(|source| ReadError {
        path: current.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| ReadError {
            path: current.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_error(path: PathBuf, source: std::io::Error) -> ContentCompileError {
    ContentCompileError {
        code: ContentErrorCode::ReadFile,
        message: format!("failed to read content: {source}"),
        file_path: path,
        location: None,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn compile_single(xml: &str) -> Result<DefDatabase, ContentCompileError> {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("defs.xml"), xml);
        compile_def_database(temp.path())
    }

    #[test]
    fn valid_compile_assigns_stable_ids_by_def_name() {
        let db = compile_single(
            r#"<Defs>
                <EntityDef><defName>zeta</defName><label>Zeta</label><kind>Axe</kind></EntityDef>
                <EntityDef><defName>alpha</defName><label>Alpha</label><kind>Lantern</kind></EntityDef>
            </Defs>"#,
        )
        .expect("compile");
        let alpha = db.entity_def_id_by_name("alpha").expect("alpha");
        let zeta = db.entity_def_id_by_name("zeta").expect("zeta");
        assert!(alpha.0 < zeta.0);
    }

    #[test]
    fn fire_and_tree_tunables_are_parsed() {
        let db = compile_single(
            r#"<Defs>
                <EntityDef>
                    <defName>camp.fire</defName><label>Fire</label><kind>Fire</kind>
                    <prompt>Add Wood</prompt><maxFuel>80</maxFuel><decayRate>0.5</decayRate>
                </EntityDef>
                <EntityDef>
                    <defName>camp.tree</defName><label>Tree</label><kind>Tree</kind>
                    <chopDuration>2.5</chopDuration><logDef>camp.log</logDef>
                    <numberOfLogs>4</numberOfLogs><scatterRadius>0.75</scatterRadius>
                </EntityDef>
            </Defs>"#,
        )
        .expect("compile");

        let fire = db.entity_def_by_name("camp.fire").expect("fire");
        assert_eq!(fire.kind, EntityKind::Fire);
        assert_eq!(fire.prompt.as_deref(), Some("Add Wood"));
        assert_eq!(fire.max_fuel, Some(80.0));
        assert_eq!(fire.decay_rate, Some(0.5));

        let tree = db.entity_def_by_name("camp.tree").expect("tree");
        assert_eq!(tree.chop_duration, Some(2.5));
        assert_eq!(tree.log_def.as_deref(), Some("camp.log"));
        assert_eq!(tree.number_of_logs, Some(4));
        assert_eq!(tree.scatter_radius, Some(0.75));
        assert_eq!(tree.fuel_value, None);
    }

    #[test]
    fn missing_def_name_reports_file_and_location() {
        let err = compile_single(r#"<Defs><EntityDef><label>X</label><kind>Log</kind></EntityDef></Defs>"#)
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert!(err.file_path.ends_with("defs.xml"));
        assert!(err.location.is_some());
    }

    #[test]
    fn missing_kind_errors() {
        let err = compile_single(r#"<Defs><EntityDef><defName>a</defName><label>A</label></EntityDef></Defs>"#)
            .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::MissingField);
        assert!(err.message.contains("kind"));
    }

    #[test]
    fn unknown_field_errors() {
        let err = compile_single(
            r#"<Defs><EntityDef><defName>a</defName><label>A</label><kind>Log</kind><mood>Happy</mood></EntityDef></Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::UnknownField);
    }

    #[test]
    fn duplicate_field_errors() {
        let err = compile_single(
            r#"<Defs><EntityDef><defName>a</defName><label>A</label><kind>Log</kind><fuelValue>1</fuelValue><fuelValue>2</fuelValue></EntityDef></Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateField);
    }

    #[test]
    fn invalid_kind_errors() {
        let err = compile_single(
            r#"<Defs><EntityDef><defName>a</defName><label>A</label><kind>Dragon</kind></EntityDef></Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn zero_max_fuel_is_rejected() {
        let err = compile_single(
            r#"<Defs><EntityDef><defName>f</defName><label>F</label><kind>Fire</kind><maxFuel>0</maxFuel></EntityDef></Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn negative_decay_rate_is_rejected() {
        let err = compile_single(
            r#"<Defs><EntityDef><defName>f</defName><label>F</label><kind>Fire</kind><decayRate>-1</decayRate></EntityDef></Defs>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidValue);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = compile_single(r#"<Defs><EntityDef><defName>a</defName></Defs>"#).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn wrong_root_errors() {
        let err = compile_single(r#"<Things></Things>"#).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::InvalidRoot);
    }

    #[test]
    fn duplicate_def_across_files_errors() {
        let temp = TempDir::new().expect("temp");
        write_file(
            &temp.path().join("a.xml"),
            r#"<Defs><EntityDef><defName>camp.axe</defName><label>A</label><kind>Axe</kind></EntityDef></Defs>"#,
        );
        write_file(
            &temp.path().join("nested").join("b.xml"),
            r#"<Defs><EntityDef><defName>camp.axe</defName><label>B</label><kind>Axe</kind></EntityDef></Defs>"#,
        );
        let err = compile_def_database(temp.path()).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::DuplicateDef);
    }

    #[test]
    fn missing_content_dir_is_read_error() {
        let temp = TempDir::new().expect("temp");
        let err = compile_def_database(&temp.path().join("absent")).expect_err("err");
        assert_eq!(err.code, ContentErrorCode::ReadFile);
    }

    #[test]
    fn shipped_base_content_compiles() {
        let content_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("assets")
            .join("base");
        let db = compile_def_database(&content_dir).expect("compile");
        for kind in [
            EntityKind::Player,
            EntityKind::Fire,
            EntityKind::TrashBox,
            EntityKind::Tree,
            EntityKind::Axe,
            EntityKind::Lantern,
            EntityKind::Log,
        ] {
            assert!(db.first_of_kind(kind).is_some(), "missing {kind:?}");
        }
    }
}

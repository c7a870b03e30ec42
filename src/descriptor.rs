use std::collections::BTreeMap;

use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::types::{ChoiceOption, DataType, DeviceClass, EntitySpec, EntityType};
use crate::visibility::VisibilityPredicate;

const INTERACTIVE_TAGS: [&str; 6] = ["number", "switch", "choice", "button", "time", "date"];

/// Labels echoing transient write status rather than naming a field.
const STATUS_LABEL_WORDS: [&str; 4] = ["probíhá", "nastavování", "writing", "settings"];

/// Parse one descriptor document into `prop -> EntitySpec`.
///
/// A document that fails to parse contributes nothing; the error is logged
/// and never propagated, so one bad page cannot abort a poll cycle.
pub fn parse_descriptor(xml: &str, page: &str) -> BTreeMap<String, EntitySpec> {
    let doc = match Document::parse(xml) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(page, error = %e, "unparsable descriptor document");
            return BTreeMap::new();
        }
    };

    let mut specs = BTreeMap::new();

    for node in elements(doc.root_element()) {
        if !INTERACTIVE_TAGS.contains(&node.tag_name().name()) {
            continue;
        }
        let Some(prop) = node.attribute("prop") else {
            continue;
        };
        specs.insert(prop.to_string(), element_spec(node, prop, page));
    }

    // Rows also carry bare prop-bearing elements with no interactive tag;
    // surface them as read-only sensors named from the row.
    for row in elements(doc.root_element()).filter(|n| n.tag_name().name() == "row") {
        for node in elements(row) {
            let tag = node.tag_name().name();
            if INTERACTIVE_TAGS.contains(&tag) || tag == "option" || tag == "label" {
                continue;
            }
            let Some(prop) = node.attribute("prop") else {
                continue;
            };
            if specs.contains_key(prop) {
                continue;
            }
            specs.insert(prop.to_string(), row_sensor_spec(row, node, prop, page));
        }
    }

    debug!(page, count = specs.len(), "parsed descriptor document");
    specs
}

/// Descriptor specs merged across all pages of a cycle. The first page to
/// define a prop supplies its spec; every defining page is remembered as a
/// device-assignment candidate.
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    specs: BTreeMap<String, EntitySpec>,
    prop_pages: BTreeMap<String, Vec<String>>,
}

impl DescriptorSet {
    pub fn add_page(&mut self, page_specs: BTreeMap<String, EntitySpec>) {
        for (prop, spec) in page_specs {
            let pages = self.prop_pages.entry(prop.clone()).or_default();
            if !pages.contains(&spec.source_page) {
                pages.push(spec.source_page.clone());
            }
            self.specs.entry(prop).or_insert(spec);
        }
    }

    pub fn get(&self, prop: &str) -> Option<&EntitySpec> {
        self.specs.get(prop)
    }

    pub fn pages_for(&self, prop: &str) -> &[String] {
        self.prop_pages.get(prop).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn specs(&self) -> &BTreeMap<String, EntitySpec> {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Props resolving to the same display string get the prop key appended
    /// so consumers can tell them apart.
    pub fn disambiguate_names(&mut self) {
        let mut cz_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut en_counts: BTreeMap<String, usize> = BTreeMap::new();
        for spec in self.specs.values() {
            *cz_counts.entry(spec.friendly_name_cz.clone()).or_default() += 1;
            *en_counts.entry(spec.friendly_name_en.clone()).or_default() += 1;
        }

        for (prop, spec) in self.specs.iter_mut() {
            if cz_counts[&spec.friendly_name_cz] > 1 {
                spec.friendly_name_cz = format!("{} ({prop})", spec.friendly_name_cz);
            }
            if en_counts[&spec.friendly_name_en] > 1 {
                spec.friendly_name_en = format!("{} ({prop})", spec.friendly_name_en);
            }
        }
    }
}

fn elements<'a>(root: Node<'a, 'a>) -> impl Iterator<Item = Node<'a, 'a>> {
    root.descendants().filter(|n| n.is_element())
}

fn attr<'a>(node: Node<'a, 'a>, name: &str) -> &'a str {
    node.attribute(name).unwrap_or("")
}

fn enclosing<'a>(node: Node<'a, 'a>, tag: &str) -> Option<Node<'a, 'a>> {
    node.ancestors()
        .skip(1)
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

fn element_spec(node: Node<'_, '_>, prop: &str, page: &str) -> EntitySpec {
    let tag = node.tag_name().name();
    let writable = !attr(node, "config").contains("readonly");

    let text = attr(node, "text");
    let text_en = attr(node, "text_en");

    let immediate_row = enclosing(node, "row");
    let context_row = immediate_row.map(labeled_context_row);
    let (row_text, row_text_en) = context_row
        .map(|r| (attr(r, "text"), attr(r, "text_en")))
        .unwrap_or(("", ""));
    let (label_text, label_text_en) = context_row
        .map(|r| label_for_element(node, r))
        .unwrap_or(("", ""));

    let texts = NameTexts {
        text,
        text_en,
        label: label_text,
        label_en: label_text_en,
        row: row_text,
        row_en: row_text_en,
    };
    let (friendly_name_cz, friendly_name_en) = resolve_names(&texts, prop);

    // visData can sit on the element itself or on its enclosing row.
    let visibility = node
        .attribute("visData")
        .or_else(|| immediate_row.and_then(|r| r.attribute("visData")))
        .and_then(VisibilityPredicate::parse);

    let mut spec = EntitySpec {
        prop: prop.to_string(),
        entity_type: EntityType::Sensor,
        writable,
        data_type: DataType::String,
        unit: None,
        min: None,
        max: None,
        step: None,
        options: Vec::new(),
        friendly_name_cz,
        friendly_name_en,
        device_class: None,
        visibility,
        source_page: page.to_string(),
    };

    match tag {
        "switch" => {
            spec.data_type = DataType::Bool;
            spec.entity_type = if writable { EntityType::Switch } else { EntityType::Sensor };
        }
        "number" => {
            spec.data_type = DataType::Real;
            let unit = non_empty(attr(node, "unit_en"))
                .or_else(|| non_empty(attr(node, "unit")))
                .map(str::to_string)
                .or_else(|| infer_unit(prop, pick(row_text_en, row_text)));
            spec.device_class = unit.as_deref().and_then(DeviceClass::from_unit);
            spec.unit = unit;
            if writable {
                spec.entity_type = EntityType::Number;
                spec.min = float_attr(node, "min");
                spec.max = float_attr(node, "max");
                spec.step = float_attr(node, "step").or(Some(1.0));
            }
        }
        "choice" => {
            spec.data_type = DataType::Enum;
            spec.options = choice_options(node);
            if writable {
                spec.entity_type = EntityType::Select;
            }
        }
        "button" => {
            spec.data_type = DataType::Action;
            if writable {
                spec.entity_type = EntityType::Button;
            }
        }
        // Time and date fields are read-only string sensors; their values
        // ("03:00", "08.07.2025") must never be treated as numeric.
        "time" => {
            spec.data_type = DataType::Time;
            spec.writable = false;
        }
        "date" => {
            spec.data_type = DataType::String;
            spec.writable = false;
        }
        _ => unreachable!("caller filters on INTERACTIVE_TAGS"),
    }

    spec
}

fn row_sensor_spec(row: Node<'_, '_>, node: Node<'_, '_>, prop: &str, page: &str) -> EntitySpec {
    let text = attr(row, "text");
    let text_en = attr(row, "text_en");

    let friendly_name_en = [text_en, text, prop]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or(prop)
        .to_string();
    let friendly_name_cz = [text, text_en, prop]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or(prop)
        .to_string();

    let unit = non_empty(attr(node, "unit_en"))
        .or_else(|| non_empty(attr(node, "unit")))
        .map(str::to_string)
        .or_else(|| infer_unit(prop, pick(text_en, text)));

    let visibility = node
        .attribute("visData")
        .or_else(|| row.attribute("visData"))
        .and_then(VisibilityPredicate::parse);

    EntitySpec {
        prop: prop.to_string(),
        entity_type: EntityType::Sensor,
        writable: false,
        data_type: DataType::String,
        device_class: unit.as_deref().and_then(DeviceClass::from_unit),
        unit,
        min: None,
        max: None,
        step: None,
        options: Vec::new(),
        friendly_name_cz,
        friendly_name_en,
        visibility,
        source_page: page.to_string(),
    }
}

/// A headerless row inherits its text from the nearest preceding row with
/// text inside the same block. With no labeled predecessor the row itself
/// is returned and name resolution bottoms out at the prop key.
fn labeled_context_row<'a>(row: Node<'a, 'a>) -> Node<'a, 'a> {
    if !attr(row, "text").is_empty() || !attr(row, "text_en").is_empty() {
        return row;
    }
    let Some(block) = enclosing(row, "block") else {
        return row;
    };
    let rows: Vec<Node> = elements(block)
        .filter(|n| n.tag_name().name() == "row")
        .collect();
    let Some(pos) = rows.iter().position(|r| *r == row) else {
        return row;
    };
    rows[..pos]
        .iter()
        .rev()
        .find(|r| !attr(**r, "text").is_empty() || !attr(**r, "text_en").is_empty())
        .copied()
        .unwrap_or(row)
}

/// Positionally match an input element to a label of the context row.
///
/// The context row may hold fewer labels than the block holds inputs; in
/// that case the labels belong to the last n inputs, so the element index
/// is shifted by the difference before indexing into the labels.
fn label_for_element<'a>(element: Node<'a, 'a>, context_row: Node<'a, 'a>) -> (&'a str, &'a str) {
    let Some(block) = enclosing(element, "block") else {
        return ("", "");
    };
    if enclosing(context_row, "block") != Some(block) && context_row != block {
        return ("", "");
    }

    let labels: Vec<Node> = elements(context_row)
        .filter(|n| n.tag_name().name() == "label" && !is_status_label(*n))
        .collect();
    if labels.is_empty() {
        return ("", "");
    }

    let inputs: Vec<Node> = elements(block)
        .filter(|n| {
            matches!(n.tag_name().name(), "number" | "switch" | "choice" | "button")
                && n.attribute("prop").is_some()
        })
        .collect();
    let Some(pos) = inputs.iter().position(|n| *n == element) else {
        return ("", "");
    };

    let offset = inputs.len() as isize - labels.len() as isize;
    let idx = pos as isize - offset;
    if idx >= 0 && (idx as usize) < labels.len() {
        let label = labels[idx as usize];
        (attr(label, "text"), attr(label, "text_en"))
    } else {
        ("", "")
    }
}

fn is_status_label(label: Node<'_, '_>) -> bool {
    let text = attr(label, "text").to_lowercase();
    STATUS_LABEL_WORDS.iter().any(|w| text.contains(w))
}

struct NameTexts<'a> {
    text: &'a str,
    text_en: &'a str,
    label: &'a str,
    label_en: &'a str,
    row: &'a str,
    row_en: &'a str,
}

/// Resolve the bilingual display names. Order matters: the combination
/// branches are tried before the flat fallback chain, and the Czech
/// resolution is the mirror image of the English one.
fn resolve_names(t: &NameTexts<'_>, prop: &str) -> (String, String) {
    let en = resolve_one(
        t.row_en, t.row, t.text_en, t.label_en, t.text, t.label, prop,
    );
    let cz = resolve_one(
        t.row, t.row_en, t.text, t.label, t.text_en, t.label_en, prop,
    );
    (cz, en)
}

/// One language's resolution. `_t` parameters are the target language,
/// `_o` the other one.
fn resolve_one(
    row_t: &str,
    row_o: &str,
    text_t: &str,
    label_t: &str,
    text_o: &str,
    label_o: &str,
    prop: &str,
) -> String {
    let elem_t = pick(text_t, label_t);
    let elem_o = pick(text_o, label_o);

    if !row_t.is_empty() && !elem_t.is_empty() {
        return format!("{row_t} - {elem_t}");
    }
    if !row_o.is_empty() && !elem_t.is_empty() {
        return format!("{row_o} - {elem_t}");
    }
    if !row_t.is_empty() && !elem_o.is_empty() {
        return format!("{row_t} - {elem_o}");
    }
    if !label_t.is_empty() {
        return label_t.to_string();
    }

    [text_t, label_t, row_t, text_o, label_o, row_o]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or(prop)
        .to_string()
}

fn pick<'a>(first: &'a str, second: &'a str) -> &'a str {
    if !first.is_empty() { first } else { second }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

fn float_attr(node: Node<'_, '_>, name: &str) -> Option<f64> {
    node.attribute(name).and_then(|v| v.parse().ok())
}

fn choice_options(node: Node<'_, '_>) -> Vec<ChoiceOption> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().name() == "option")
        .map(|opt| {
            let value = attr(opt, "value");
            let text = attr(opt, "text");
            let text_en = attr(opt, "text_en");
            ChoiceOption {
                value: value.to_string(),
                label_cz: [text, text_en, value]
                    .into_iter()
                    .find(|s| !s.is_empty())
                    .unwrap_or("")
                    .to_string(),
                label_en: [text_en, text, value]
                    .into_iter()
                    .find(|s| !s.is_empty())
                    .unwrap_or("")
                    .to_string(),
            }
        })
        .collect()
}

/// Units the controller omits can often be recovered from the row text or
/// the prop naming conventions (Czech and English).
fn infer_unit(prop: &str, row_text: &str) -> Option<String> {
    let row = row_text.to_lowercase();
    if ["temperature", "teplota", "temp."].iter().any(|w| row.contains(w)) {
        return Some("°C".to_string());
    }
    if ["power", "výkon", "watt"].iter().any(|w| row.contains(w)) {
        return Some("W".to_string());
    }
    if ["price", "cena", "cost"].iter().any(|w| row.contains(w)) {
        return Some("€/MWh".to_string());
    }

    let p = prop.to_uppercase();
    let has = |words: &[&str]| words.iter().any(|w| p.contains(w));
    if has(&["TEMP", "TEPLOTA", "TEPL"]) {
        Some("°C".to_string())
    } else if has(&["POWER", "VYKON", "PREBYTEK"]) {
        Some("W".to_string())
    } else if has(&["PRICE", "CENA", "COST"]) {
        Some("€/MWh".to_string())
    } else if has(&["CAS", "TIME", "HODIN", "HOURS"]) {
        Some("h".to_string())
    } else if has(&["DNI", "DAYS", "INTERVAL"]) {
        Some("days".to_string())
    } else if has(&["SOC", "PERCENT"]) {
        Some("%".to_string())
    } else if has(&["PRESSURE", "TLAK"]) {
        Some("bar".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> BTreeMap<String, EntitySpec> {
        parse_descriptor(xml, "TEST.XML")
    }

    #[test]
    fn malformed_document_yields_empty_map() {
        assert!(parse("<page><row></page>").is_empty());
        assert!(parse("not xml at all").is_empty());
    }

    #[test]
    fn element_without_prop_is_skipped() {
        let specs = parse(r#"<page><row><number min="0" max="1"/></row></page>"#);
        assert!(specs.is_empty());
    }

    #[test]
    fn writable_number_keeps_constraints() {
        let specs = parse(
            r#"<page><row text="Nastavení">
                <number prop="X" min="10" max="30" step="0.5" unit="°C"/>
            </row></page>"#,
        );
        let spec = &specs["X"];
        assert_eq!(spec.entity_type, EntityType::Number);
        assert_eq!(spec.data_type, DataType::Real);
        assert!(spec.writable);
        assert_eq!(spec.min, Some(10.0));
        assert_eq!(spec.max, Some(30.0));
        assert_eq!(spec.step, Some(0.5));
    }

    #[test]
    fn number_step_defaults_to_one() {
        let specs = parse(r#"<page><row><number prop="X" min="0" max="9"/></row></page>"#);
        assert_eq!(specs["X"].step, Some(1.0));
    }

    #[test]
    fn readonly_number_becomes_sensor() {
        let specs = parse(
            r#"<page><row text="Teplota venku" text_en="Outdoor temperature">
                <number config="readonly" prop="SVENKU" unit="&#176;C"/>
            </row></page>"#,
        );
        let spec = &specs["SVENKU"];
        assert_eq!(spec.entity_type, EntityType::Sensor);
        assert!(!spec.writable);
        assert_eq!(spec.data_type, DataType::Real);
        assert_eq!(spec.unit.as_deref(), Some("°C"));
        assert_eq!(spec.device_class, Some(DeviceClass::Temperature));
    }

    #[test]
    fn readonly_switch_becomes_sensor() {
        let specs = parse(r#"<page><row><switch prop="S" config="readonly"/></row></page>"#);
        assert_eq!(specs["S"].entity_type, EntityType::Sensor);
        assert_eq!(specs["S"].data_type, DataType::Bool);
    }

    #[test]
    fn readonly_choice_keeps_options_but_is_sensor() {
        let specs = parse(
            r#"<page><row><choice prop="C" config="readonly">
                <option value="0" text="Vypnuto" text_en="Off"/>
                <option value="1" text="Zapnuto" text_en="On"/>
            </choice></row></page>"#,
        );
        let spec = &specs["C"];
        assert_eq!(spec.entity_type, EntityType::Sensor);
        assert_eq!(spec.data_type, DataType::Enum);
        assert_eq!(spec.options.len(), 2);
    }

    #[test]
    fn choice_options_keep_document_order_and_fallbacks() {
        let specs = parse(
            r#"<page><row><choice prop="C">
                <option value="2" text_en="High"/>
                <option value="1" text="Nízký"/>
                <option value="0"/>
            </choice></row></page>"#,
        );
        let opts = &specs["C"].options;
        assert_eq!(opts[0].value, "2");
        assert_eq!(opts[0].label_cz, "High", "cz falls back to en");
        assert_eq!(opts[1].label_en, "Nízký", "en falls back to cz");
        assert_eq!(opts[2].label_cz, "0", "both fall back to value");
        assert_eq!(opts[2].label_en, "0");
    }

    #[test]
    fn time_and_date_are_readonly_sensors() {
        let specs = parse(
            r#"<page><row>
                <time prop="T"/>
                <date prop="D" unit="h"/>
            </row></page>"#,
        );
        assert_eq!(specs["T"].entity_type, EntityType::Sensor);
        assert_eq!(specs["T"].data_type, DataType::Time);
        assert!(!specs["T"].writable);
        assert_eq!(specs["D"].data_type, DataType::String);
        assert!(!specs["D"].writable);
    }

    #[test]
    fn switch_is_bool_and_writable_by_default() {
        let specs = parse(r#"<page><row><switch prop="S"/></row></page>"#);
        assert_eq!(specs["S"].entity_type, EntityType::Switch);
        assert!(specs["S"].writable);
    }

    // -- bilingual name resolution --

    #[test]
    fn name_combines_row_and_element_per_language() {
        let specs = parse(
            r#"<page><row text="Teplota" text_en="Temperature">
                <number prop="X" text="Venku" text_en="Outdoor"/>
            </row></page>"#,
        );
        assert_eq!(specs["X"].friendly_name_cz, "Teplota - Venku");
        assert_eq!(specs["X"].friendly_name_en, "Temperature - Outdoor");
        assert_ne!(specs["X"].friendly_name_cz, specs["X"].friendly_name_en);
    }

    #[test]
    fn czech_row_with_english_element_mixes() {
        let specs = parse(
            r#"<page><row text="Teplota">
                <number prop="X" text_en="Outdoor"/>
            </row></page>"#,
        );
        assert_eq!(specs["X"].friendly_name_en, "Teplota - Outdoor");
        assert_eq!(specs["X"].friendly_name_cz, "Teplota - Outdoor");
    }

    #[test]
    fn english_row_with_czech_element_mixes() {
        let specs = parse(
            r#"<page><row text_en="Temperature">
                <number prop="X" text="Venku"/>
            </row></page>"#,
        );
        assert_eq!(specs["X"].friendly_name_en, "Temperature - Venku");
        assert_eq!(specs["X"].friendly_name_cz, "Temperature - Venku");
    }

    #[test]
    fn row_text_alone_names_the_entity() {
        let specs = parse(
            r#"<page><row text="Výkon baterie" text_en="Battery power">
                <number config="readonly" prop="FVEG-PANEL" unit="W"/>
            </row></page>"#,
        );
        assert_eq!(specs["FVEG-PANEL"].friendly_name_en, "Battery power");
        assert_eq!(specs["FVEG-PANEL"].friendly_name_cz, "Výkon baterie");
        assert_eq!(specs["FVEG-PANEL"].device_class, Some(DeviceClass::Power));
    }

    #[test]
    fn element_text_alone_names_the_entity() {
        let specs = parse(
            r#"<page><row><number prop="X" text="Jen česky"/></row></page>"#,
        );
        assert_eq!(specs["X"].friendly_name_cz, "Jen česky");
        assert_eq!(specs["X"].friendly_name_en, "Jen česky", "en falls back to cz");
    }

    #[test]
    fn no_text_anywhere_falls_back_to_prop() {
        let specs = parse(r#"<page><row><number prop="BARE-PROP"/></row></page>"#);
        assert_eq!(specs["BARE-PROP"].friendly_name_cz, "BARE-PROP");
        assert_eq!(specs["BARE-PROP"].friendly_name_en, "BARE-PROP");
    }

    #[test]
    fn label_names_element_when_row_has_no_text() {
        let specs = parse(
            r#"<page><block><row>
                <label text="Povolení" text_en="Enable"/>
                <switch prop="EN"/>
            </row></block></page>"#,
        );
        assert_eq!(specs["EN"].friendly_name_en, "Enable");
        assert_eq!(specs["EN"].friendly_name_cz, "Povolení");
    }

    #[test]
    fn labels_align_with_last_inputs_when_fewer() {
        // Two inputs, one label: the label belongs to the second input.
        let specs = parse(
            r#"<page><block><row text="Rozsah" text_en="Range">
                <number prop="FIRST"/>
                <label text="Horní" text_en="Upper"/>
                <number prop="SECOND"/>
            </row></block></page>"#,
        );
        assert_eq!(specs["SECOND"].friendly_name_en, "Range - Upper");
        assert_eq!(specs["FIRST"].friendly_name_en, "Range");
    }

    #[test]
    fn status_labels_are_not_names() {
        let specs = parse(
            r#"<page><block><row>
                <label text="Probíhá nastavování"/>
                <switch prop="S"/>
            </row></block></page>"#,
        );
        assert_eq!(specs["S"].friendly_name_cz, "S");
    }

    #[test]
    fn headerless_row_inherits_previous_row_text() {
        let specs = parse(
            r#"<page><block>
                <row text="Topý okruh" text_en="Heating circuit">
                    <number prop="A" text="Den" text_en="Day"/>
                </row>
                <row>
                    <number prop="B" text="Noc" text_en="Night"/>
                </row>
            </block></page>"#,
        );
        assert_eq!(specs["B"].friendly_name_en, "Heating circuit - Night");
    }

    #[test]
    fn headerless_row_at_block_start_falls_back_to_prop() {
        let specs = parse(
            r#"<page><block><row><number prop="LONE"/></row></block></page>"#,
        );
        assert_eq!(specs["LONE"].friendly_name_cz, "LONE");
    }

    // -- visibility --

    #[test]
    fn vis_data_on_element_attaches_predicate() {
        let specs = parse(
            r#"<page><row><number prop="X" visData="1;W;0"/></row></page>"#,
        );
        let vis = specs["X"].visibility.as_ref().unwrap();
        assert_eq!(vis.conditions, vec![("W".to_string(), "0".to_string())]);
    }

    #[test]
    fn vis_data_on_row_applies_to_children() {
        let specs = parse(
            r#"<page><row visData="2;FVE-ENABLED;1;FVE-KOMUNIKOVAT;1">
                <number config="readonly" prop="FVEG-PANEL" unit="W"/>
            </row></page>"#,
        );
        assert_eq!(specs["FVEG-PANEL"].visibility.as_ref().unwrap().conditions.len(), 2);
    }

    #[test]
    fn malformed_vis_data_leaves_entity_unconditional() {
        let specs = parse(
            r#"<page><row><number prop="X" visData="banana;Y;1"/></row></page>"#,
        );
        assert!(specs["X"].visibility.is_none());
    }

    // -- unit inference --

    #[test]
    fn unit_inferred_from_prop_name() {
        let specs = parse(r#"<page><row><number prop="TUVPOZADOVANA-TEPLOTA"/></row></page>"#);
        assert_eq!(specs["TUVPOZADOVANA-TEPLOTA"].unit.as_deref(), Some("°C"));
    }

    #[test]
    fn unit_en_preferred_over_unit() {
        let specs = parse(
            r#"<page><row><number prop="X" unit="kWh" unit_en="kW"/></row></page>"#,
        );
        assert_eq!(specs["X"].unit.as_deref(), Some("kW"));
        assert_eq!(specs["X"].device_class, Some(DeviceClass::Power));
    }

    // -- row-context sensors --

    #[test]
    fn bare_prop_element_becomes_row_named_sensor() {
        let specs = parse(
            r#"<page><row text="Stav kompresoru" text_en="Compressor state">
                <value prop="KOMP-STAV"/>
            </row></page>"#,
        );
        let spec = &specs["KOMP-STAV"];
        assert_eq!(spec.entity_type, EntityType::Sensor);
        assert!(!spec.writable);
        assert_eq!(spec.friendly_name_en, "Compressor state");
    }

    // -- duplicate name handling --

    #[test]
    fn duplicate_names_get_prop_suffix() {
        let mut set = DescriptorSet::default();
        set.add_page(parse(
            r#"<page>
                <row text="Teplota" text_en="Temperature"><number config="readonly" prop="T1"/></row>
                <row text="Teplota" text_en="Temperature"><number config="readonly" prop="T2"/></row>
            </page>"#,
        ));
        set.disambiguate_names();
        assert_eq!(set.get("T1").unwrap().friendly_name_en, "Temperature (T1)");
        assert_eq!(set.get("T2").unwrap().friendly_name_en, "Temperature (T2)");
    }

    #[test]
    fn first_descriptor_page_wins_but_all_pages_recorded() {
        let mut set = DescriptorSet::default();
        set.add_page(parse_descriptor(
            r#"<page><row><number prop="Y" min="0" max="1"/></row></page>"#,
            "FVE.XML",
        ));
        set.add_page(parse_descriptor(
            r#"<page><row><number prop="Y" min="5" max="9"/></row></page>"#,
            "TUV1.XML",
        ));
        assert_eq!(set.get("Y").unwrap().source_page, "FVE.XML");
        assert_eq!(set.pages_for("Y"), ["FVE.XML", "TUV1.XML"]);
    }
}

//! block extraction
//!
//! A block body becomes a `config` [Map]: every resolvable attribute, plus one entry per followed nested block kind.
//!
//! Which nested blocks are followed is decided by a [NestingTable]. Depth 1 is a direct child of the extracted block,
//! depth 2 a grandchild. Nothing deeper than [MAX_DEPTH] is ever followed.
//!
//! Repeated siblings of the same kind are merged by [Multiplicity]:
//!
//! ```hcl
//! resource "aws_lb_listener" "web" {
//!   port = 443
//!   default_action { type = "forward" }     # default_action = { type = "forward" }
//!   rule { priority = 1 }                   # rule = { priority = 1 }
//!   rule { priority = 2 }                   # rule = [{ priority = 1 }, { priority = 2 }]
//!   versioning {}                           # versioning = true
//! }
//! ```
use crate::resolve::resolve;
use crate::value::{Map, Value};
use std::ops::RangeInclusive;

/// Deepest nesting level that is followed, regardless of the table
pub const MAX_DEPTH: usize = 2;

/// Nested block kinds worth extracting, and at which depths
#[derive(Debug, Clone, PartialEq)]
pub struct NestingTable {
    rules: Vec<(String, RangeInclusive<usize>)>,
}

impl NestingTable {
    /// A table that follows nothing
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Follow `kind` at the given depths
    ///
    /// Depths beyond [MAX_DEPTH] are accepted but never reached.
    pub fn follow(mut self, kind: impl Into<String>, depths: RangeInclusive<usize>) -> Self {
        self.rules.push((kind.into(), depths));
        self
    }

    pub fn follows(&self, kind: &str, depth: usize) -> bool {
        depth <= MAX_DEPTH
            && self
                .rules
                .iter()
                .any(|(rule_kind, depths)| rule_kind == kind && depths.contains(&depth))
    }
}

impl Default for NestingTable {
    /// Blocks relevant to storage encryption, logging, versioning and load balancer listeners
    fn default() -> Self {
        Self::empty()
            .follow("server_side_encryption_configuration", 1..=1)
            .follow("logging", 1..=1)
            .follow("versioning", 1..=1)
            .follow("versioning_configuration", 1..=1)
            .follow("default_action", 1..=1)
            .follow("rule", 1..=2)
            .follow("redirect", 1..=2)
            .follow("apply_server_side_encryption_by_default", 2..=2)
    }
}

/// Merge state of all nested blocks of one kind
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Multiplicity {
    #[default]
    Absent,
    /// Only blocks without extractable content were seen
    Marker,
    Single(Map),
    Many(Vec<Map>),
}

impl Multiplicity {
    /// Merge the next sibling
    ///
    /// An empty sibling only ever fills an absent slot. A marker is replaced by the first non-empty sibling.
    pub fn absorb(&mut self, child: Map) {
        let current = std::mem::take(self);

        *self = match (current, child.is_empty()) {
            (Multiplicity::Absent | Multiplicity::Marker, true) => Multiplicity::Marker,
            (Multiplicity::Absent | Multiplicity::Marker, false) => Multiplicity::Single(child),
            (Multiplicity::Single(first), false) => Multiplicity::Many(vec![first, child]),
            (Multiplicity::Many(mut all), false) => {
                all.push(child);
                Multiplicity::Many(all)
            }
            (unchanged, true) => unchanged,
        };
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Multiplicity::Absent => None,
            Multiplicity::Marker => Some(Value::Bool(true)),
            Multiplicity::Single(map) => Some(Value::Map(map)),
            Multiplicity::Many(maps) => Some(Value::List(
                maps.into_iter().map(Value::Map).collect(),
            )),
        }
    }
}

/// Extracts `config` maps from block bodies
#[derive(Debug, Default, Clone, derive_new::new)]
pub struct Extractor {
    nesting: NestingTable,
}

impl Extractor {
    pub fn nesting(&self) -> &NestingTable {
        &self.nesting
    }

    /// Extract the config of a top level block
    pub fn extract(&self, body: &hcl::Body) -> Map {
        self.extract_at(body, 0)
    }

    fn extract_at(&self, body: &hcl::Body, depth: usize) -> Map {
        let mut config = Map::new();

        for attribute in body.attributes() {
            match resolve(&attribute.expr) {
                Some(value) => {
                    config.insert(attribute.key.to_string(), value);
                }
                None => tracing::trace!(key=%attribute.key, depth, "attribute omitted"),
            }
        }

        let child_depth = depth + 1;
        let mut nested: indexmap::IndexMap<&str, Multiplicity> = Default::default();

        for block in body.blocks() {
            let kind = block.identifier.as_str();
            if !self.nesting.follows(kind, child_depth) {
                tracing::trace!(kind, depth = child_depth, "nested block not followed");
                continue;
            }

            let child = self.extract_at(&block.body, child_depth);
            let slot = nested.entry(kind).or_default();
            slot.absorb(child);
            tracing::trace!(kind, depth = child_depth, state=?slot, "nested block merged");
        }

        for (kind, slot) in nested {
            if let Some(value) = slot.into_value() {
                config.insert(kind.to_string(), value);
            }
        }

        config
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::parse_body;
    use pretty_assertions::assert_eq;

    fn map(entries: Vec<(&str, Value)>) -> Map {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    fn extract(source: &str) -> Map {
        let body = parse_body(source).expect("body must parse");
        Extractor::default().extract(&body)
    }

    #[test]
    fn attributes_are_resolved_or_omitted() {
        let config = extract(
            r#"
            bucket = "logs"
            acl    = var.acl
            policy = jsonencode({})
            "#,
        );

        assert_eq!(
            config,
            map(vec![("bucket", "logs".into()), ("acl", "var.acl".into())])
        );
    }

    #[test]
    fn multiplicity_follows_sibling_count() {
        assert_eq!(extract("").get("rule"), None);

        assert_eq!(
            extract("rule { id = 1 }").get("rule"),
            Some(&Value::Map(map(vec![("id", Value::Number(1.0))])))
        );

        let two = extract("rule { id = 1 }\nrule { id = 2 }");
        assert_eq!(two["rule"].as_list().map(<[Value]>::len), Some(2));

        let three = extract("rule { id = 1 }\nrule { id = 2 }\nrule { id = 3 }");
        assert_eq!(
            three["rule"],
            Value::List(
                (1..=3)
                    .map(|id| Value::Map(map(vec![("id", Value::Number(id as f64))])))
                    .collect()
            )
        );
    }

    #[test]
    fn empty_blocks_are_markers() {
        assert_eq!(extract("versioning {}")["versioning"], Value::Bool(true));
        assert_eq!(
            extract("versioning {}\nversioning {}")["versioning"],
            Value::Bool(true)
        );
    }

    #[test]
    fn marker_is_replaced_by_later_content() {
        assert_eq!(
            extract("logging {}\nlogging { target_bucket = \"logs\" }")["logging"],
            Value::Map(map(vec![("target_bucket", "logs".into())]))
        );
    }

    #[test]
    fn empty_sibling_keeps_existing_content() {
        assert_eq!(
            extract("logging { target_bucket = \"logs\" }\nlogging {}")["logging"],
            Value::Map(map(vec![("target_bucket", "logs".into())]))
        );
    }

    #[test]
    fn unknown_nested_blocks_are_skipped() {
        assert_eq!(extract("lifecycle { prevent_destroy = true }"), Map::new());
    }

    #[test]
    fn depth_bound() {
        let config = extract(
            r#"
            server_side_encryption_configuration {
              rule {
                apply_server_side_encryption_by_default {
                  sse_algorithm = "aws:kms"
                }
                bucket_key_enabled = true
              }
            }
            "#,
        );

        let rule = config["server_side_encryption_configuration"]
            .get("rule")
            .expect("rule is followed at depth 2");

        // apply_server_side_encryption_by_default would be depth 3
        assert_eq!(rule, &Value::Map(map(vec![("bucket_key_enabled", true.into())])));
    }

    #[test]
    fn grandchildren_are_merged() {
        let config = extract(
            r#"
            default_action {
              type = "redirect"
              redirect {
                protocol    = "HTTPS"
                status_code = "HTTP_301"
              }
            }
            "#,
        );

        assert_eq!(
            config["default_action"],
            Value::Map(map(vec![
                ("type", "redirect".into()),
                (
                    "redirect",
                    Value::Map(map(vec![
                        ("protocol", "HTTPS".into()),
                        ("status_code", "HTTP_301".into()),
                    ]))
                ),
            ]))
        );
    }

    #[test]
    fn depth_restricted_kinds() {
        // only followed below another block
        assert_eq!(
            extract("apply_server_side_encryption_by_default { sse_algorithm = \"AES256\" }"),
            Map::new()
        );
        // only followed directly below the resource
        assert_eq!(
            extract("rule {\n  logging { enabled = true }\n}")["rule"],
            Value::Bool(true)
        );
    }

    #[test]
    fn custom_table() {
        let body = parse_body("ingress { from_port = 443 }\negress {}").unwrap();
        let extractor = Extractor::new(NestingTable::empty().follow("ingress", 1..=1));

        assert_eq!(
            extractor.extract(&body),
            map(vec![(
                "ingress",
                Value::Map(map(vec![("from_port", Value::Number(443.0))]))
            )])
        );
    }

    #[test]
    fn table_never_exceeds_max_depth() {
        let table = NestingTable::empty().follow("rule", 1..=5);
        assert!(table.follows("rule", MAX_DEPTH));
        assert!(!table.follows("rule", MAX_DEPTH + 1));
    }

    #[test]
    fn multiplicity_transitions() {
        let mut slot = Multiplicity::default();
        slot.absorb(Map::new());
        assert_eq!(slot, Multiplicity::Marker);

        let one = map(vec![("n", Value::Number(1.0))]);
        let two = map(vec![("n", Value::Number(2.0))]);

        slot.absorb(one.clone());
        assert_eq!(slot, Multiplicity::Single(one.clone()));

        slot.absorb(Map::new());
        assert_eq!(slot, Multiplicity::Single(one.clone()));

        slot.absorb(two.clone());
        assert_eq!(slot, Multiplicity::Many(vec![one, two]));
        assert_eq!(Multiplicity::Absent.into_value(), None);
    }
}

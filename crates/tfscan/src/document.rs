//! Normalized model of one or more terraform documents
use crate::extract::Extractor;
use crate::resolve::resolve;
use crate::value::{Map, Value};
use serde::Serialize;

/// The rule engine input
///
/// Built fresh for every scan and never modified once handed over.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct NormalizedDocument {
    /// Every `resource "type" "name"` block in source order, duplicates included
    pub resources: Vec<NormalizedResource>,
    /// `variable` blocks by name, the last one wins
    pub variables: indexmap::IndexMap<String, NormalizedVariable>,
    /// `output` blocks by name, the last one wins
    pub outputs: indexmap::IndexMap<String, NormalizedOutput>,
}

impl NormalizedDocument {
    /// All resources with the given address
    pub fn resources_at<'a>(
        &'a self,
        address: &'a str,
    ) -> impl Iterator<Item = &'a NormalizedResource> + 'a {
        self.resources
            .iter()
            .filter(move |resource| resource.address == address)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub address: String,
    pub config: Map,
}

impl NormalizedResource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>, config: Map) -> Self {
        let resource_type = resource_type.into();
        let name = name.into();
        Self {
            address: format!("{resource_type}.{name}"),
            resource_type,
            name,
            config,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, derive_new::new)]
pub struct NormalizedVariable {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedOutput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(thiserror::Error, Debug)]
#[error("Unable to parse terraform configuration")]
pub struct ParseError(#[from] hcl_edit::parser::Error);

/// Parse configuration text into a block tree
pub fn parse_body(text: &str) -> Result<hcl::Body, ParseError> {
    let body = hcl_edit::parser::parse_body(text)?;
    Ok(body.into())
}

/// Builds a [NormalizedDocument] from the top level blocks of a body
#[derive(Debug, Default, Clone, derive_new::new)]
pub struct Aggregator {
    extractor: Extractor,
}

impl Aggregator {
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Parse and aggregate in one go
    pub fn parse(&self, text: &str) -> Result<NormalizedDocument, ParseError> {
        Ok(self.aggregate(&parse_body(text)?))
    }

    /// Aggregate `resource`, `variable` and `output` blocks
    ///
    /// Malformed blocks and unknown block kinds are skipped.
    pub fn aggregate(&self, body: &hcl::Body) -> NormalizedDocument {
        let mut document = NormalizedDocument::default();

        for (index, block) in body.blocks().enumerate() {
            let labels: Vec<&str> = block.labels.iter().map(|label| label.as_str()).collect();

            match block.identifier.as_str() {
                "resource" => {
                    let [resource_type, name] = labels.as_slice() else {
                        tracing::debug!(index, ?labels, "resource block needs exactly two labels");
                        continue;
                    };

                    let config = self.extractor.extract(&block.body);
                    document
                        .resources
                        .push(NormalizedResource::new(*resource_type, *name, config));
                }
                "variable" => {
                    let Some(name) = labels.first() else {
                        tracing::debug!(index, "variable block without name");
                        continue;
                    };

                    document
                        .variables
                        .insert(name.to_string(), NormalizedVariable::new(name.to_string()));
                }
                "output" => {
                    let Some(name) = labels.first() else {
                        tracing::debug!(index, "output block without name");
                        continue;
                    };

                    document
                        .outputs
                        .insert(name.to_string(), output(name, &block.body));
                }
                other => tracing::debug!(index, kind = other, "block skipped"),
            }
        }

        tracing::debug!(
            resources = document.resources.len(),
            variables = document.variables.len(),
            outputs = document.outputs.len(),
            "document aggregated"
        );

        document
    }
}

fn output(name: &str, body: &hcl::Body) -> NormalizedOutput {
    let attribute = |key: &str| {
        body.attributes()
            .find(|attribute| attribute.key.as_str() == key)
            .and_then(|attribute| resolve(&attribute.expr))
    };

    NormalizedOutput {
        name: name.to_string(),
        value: attribute("value"),
        description: match attribute("description") {
            Some(Value::String(description)) => Some(description),
            _ => None,
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn aggregate(source: &str) -> NormalizedDocument {
        Aggregator::default().parse(source).expect("must parse")
    }

    #[test]
    fn resource_address() {
        let document = aggregate(
            r#"
            resource "aws_s3_bucket" "logs" {
              bucket = "company-logs"
            }
            "#,
        );

        assert_eq!(document.resources.len(), 1);
        let resource = &document.resources[0];
        assert_eq!(resource.resource_type, "aws_s3_bucket");
        assert_eq!(resource.name, "logs");
        assert_eq!(resource.address, "aws_s3_bucket.logs");
        assert_eq!(resource.config["bucket"], Value::from("company-logs"));
    }

    #[test]
    fn resources_with_wrong_label_count_are_skipped() {
        let document = aggregate(
            r#"
            resource "aws_s3_bucket" {}
            resource "aws_s3_bucket" "a" "b" {}
            resource "aws_s3_bucket" "kept" {}
            "#,
        );

        let addresses: Vec<_> = document.resources.iter().map(|r| &r.address).collect();
        assert_eq!(addresses, vec!["aws_s3_bucket.kept"]);
    }

    #[test]
    fn duplicate_resources_are_kept() {
        let document = aggregate(
            r#"
            resource "aws_s3_bucket" "logs" { acl = "private" }
            resource "aws_s3_bucket" "logs" { acl = "public-read" }
            "#,
        );

        assert_eq!(document.resources_at("aws_s3_bucket.logs").count(), 2);
    }

    #[test]
    fn variables_and_outputs_are_keyed_by_name() {
        let document = aggregate(
            r#"
            variable "region" {
              default = "eu-west-1"
            }
            variable "region" {}
            variable {}

            output "bucket_arn" {
              value       = aws_s3_bucket.logs.arn
              description = "bucket arn"
            }
            output "computed" {
              value = "${var.prefix}-logs"
            }
            "#,
        );

        assert_eq!(
            document.variables.keys().collect::<Vec<_>>(),
            vec!["region"]
        );
        assert_eq!(
            document.outputs["bucket_arn"],
            NormalizedOutput {
                name: "bucket_arn".into(),
                value: Some("aws_s3_bucket.logs.arn".into()),
                description: Some("bucket arn".into()),
            }
        );
        assert_eq!(document.outputs["computed"].value, None);
    }

    #[test]
    fn other_blocks_and_root_attributes_are_ignored() {
        let document = aggregate(
            r#"
            terraform {
              required_version = ">= 1.5"
            }
            provider "aws" {
              region = "eu-west-1"
            }
            data "aws_caller_identity" "current" {}
            locals = 1
            "#,
        );

        assert_eq!(document, NormalizedDocument::default());
    }

    #[test]
    fn parse_errors() {
        assert!(Aggregator::default().parse("resource {").is_err());
    }

    #[test]
    fn serialized_shape() {
        let document = aggregate(
            r#"
            resource "aws_s3_bucket" "logs" {
              versioning {}
            }
            variable "env" {}
            "#,
        );

        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            serde_json::json!({
                "resources": [{
                    "type": "aws_s3_bucket",
                    "name": "logs",
                    "address": "aws_s3_bucket.logs",
                    "config": { "versioning": true }
                }],
                "variables": { "env": { "name": "env" } },
                "outputs": {}
            })
        );
    }
}

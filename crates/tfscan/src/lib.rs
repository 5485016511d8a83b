//! # tfscan - compliance scanning for terraform configuration
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tfscan` works internally.
//!
//! ### HCL Terms
//!
//! - a file gets parsed as a `body`
//! - ...which is just a list of `structures`
//! - ...where there are two kinds:
//!   - `attribute`: a "key = expression" pair
//!   - or `block`:
//!     - 1 `identifier` (here called the block kind)
//!     - followed by 0 or more `labels`
//!     - and a `body` enclosed in `{` and `}`
//!
//! ```hcl
//! resource "aws_s3_bucket" "logs" {
//!   bucket = "company-logs"
//!   acl    = var.acl
//!
//!   versioning {
//!     enabled = true
//!   }
//! }
//! ```
//!
//! ### Loading files
//!
//! see [sources::Sources]
//!
//! A single file is read as is. A directory is walked recursively for `*.tf` files, skipping `.terraform` cache
//! directories. All sources are concatenated (each followed by a blank line) and parsed once. This is what gives
//! merged documents their collision semantics: two `variable "x"` blocks collapse into one entry, two
//! `resource "t" "n"` blocks stay two resources.
//!
//! ### Normalizing
//!
//! see [document::Aggregator]
//!
//! Only `resource`, `variable` and `output` blocks are of interest. Everything malformed is skipped quietly (with a
//! debug log), a broken resource never prevents the others from being evaluated.
//!
//! Each resource body goes through [extract::Extractor]:
//!
//! - attributes are resolved by [resolve::resolve]: literals become [value::Value]s, pure traversals such as
//!   `aws_kms_key.main.arn` become the string `"aws_kms_key.main.arn"`, anything else is omitted
//! - nested blocks listed in the [extract::NestingTable] are extracted the same way, at most two levels deep
//! - repeated nested blocks are merged: one block is a map, more become a list of maps, an empty block is `true`
//!
//! **Example**
//!
//! ```hcl
//! resource "aws_lb_listener" "https" {
//!   load_balancer_arn = aws_lb.main.arn
//!   port              = 443
//!   certificate_arn   = "${aws_acm_certificate.main.arn}"
//!   ssl_policy        = var.ssl_policy != "" ? var.ssl_policy : "default"
//!
//!   default_action {
//!     type = "forward"
//!   }
//! }
//! ```
//!
//! | **config key**      | **value**                          |
//! |---------------------|------------------------------------|
//! | `load_balancer_arn` | `"aws_lb.main.arn"`                |
//! | `port`              | `443`                              |
//! | `certificate_arn`   | `"aws_acm_certificate.main.arn"`   |
//! | `ssl_policy`        | _omitted_                          |
//! | `default_action`    | `{ type = "forward" }`             |
//!
//! ### Evaluation
//!
//! see [scan::Scanner]
//!
//! The [document::NormalizedDocument] is handed to a [rules::RuleEngine], which answers with violations, warnings
//! and passed findings. The [scan::ScanResult] adds a score (percentage of passed findings) and a timestamp.
//!
pub mod document;
pub mod extract;
pub mod resolve;
pub mod rules;
pub mod scan;
pub mod sources;
pub mod value;

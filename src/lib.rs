// ridgeprint: fingerprint biometric core
//
// Raw sensor buffer to minutiae template, and template-to-template
// matching:
//
//   decode → quality → enhance → extract → describe → match
//
// Every stage is a plain function over owned grids; `pipeline::Pipeline`
// strings them together for enrollment and verification. Templates travel
// between processes in the FPT1 byte layout of `serialize`.

pub mod image;
pub mod convolution;
pub mod blocks;
pub mod gradient;
pub mod gabor;

pub mod decode;
pub mod quality;
pub mod normalize;
pub mod segment;
pub mod orientation;
pub mod frequency;
pub mod ridge_filter;
pub mod thinning;
pub mod enhance;

pub mod template;
pub mod minutiae;
pub mod singular;
pub mod extract;
pub mod descriptor;
pub mod matcher;
pub mod serialize;

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{Config, EnhanceConfig, Purpose, QualityThresholds};
pub use decode::{decode, Sample};
pub use error::{FingerprintError, Result};
pub use matcher::{match_templates, Decision, MatchResult, Reason, Strategy};
pub use pipeline::Pipeline;
pub use serialize::{from_bytes, to_bytes};
pub use template::{CoreKind, CorePoint, FingerprintTemplate, Minutia, MinutiaKind, PointKind, TupleDescriptor};

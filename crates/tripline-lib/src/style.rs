//! Style rules and first-match color resolution
//!
//! A style is an ordered list of [`StyleRule`]s. Compiling it resolves each rule's
//! color once, so per-trip resolution only evaluates filters in declared order.

use crate::color::{self, LineColor, Rgba};
use crate::trip::{GeometryKind, Properties, Trip};
use crate::StyleError;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Color returned when no rule matches a trip
const NO_MATCH_COLOR: Rgba = [0, 0, 0, 255];

/// Host-supplied predicate for [`Filter::Custom`]
pub type Predicate = Arc<dyn Fn(&FilterFeature<'_>) -> bool + Send + Sync>;

/// What a filter sees of a trip
#[derive(Debug, Clone, Copy)]
pub struct FilterFeature<'a> {
    pub kind: GeometryKind,
    pub properties: &'a Properties,
}

impl<'a> FilterFeature<'a> {
    pub fn new(kind: GeometryKind, properties: &'a Properties) -> Self {
        Self { kind, properties }
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }
}

/// Predicate over a trip's attributes and geometry type
///
/// With the `serde` feature filters are written externally tagged in camelCase,
/// e.g. `"always"`, `{"eq": ["vendor", 0]}` or `{"all": [{"has": "route"}, "never"]}`.
/// `Custom` predicates only exist in code.
#[derive(Clone, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum Filter {
    #[default]
    Always,
    Never,
    GeometryType(GeometryKind),
    Has(String),
    NotHas(String),
    Eq(String, Value),
    NotEq(String, Value),
    In(String, Vec<Value>),
    Lt(String, f64),
    Le(String, f64),
    Gt(String, f64),
    Ge(String, f64),
    All(Vec<Filter>),
    Any(Vec<Filter>),
    Not(Box<Filter>),
    #[cfg_attr(feature = "serde", serde(skip))]
    Custom(Predicate),
}

impl Filter {
    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(key.into(), value.into())
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&FilterFeature<'_>) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(predicate))
    }

    pub fn matches(&self, feature: &FilterFeature<'_>) -> bool {
        let compare = |key: &str, op: fn(f64, f64) -> bool, rhs: f64| {
            feature.number(key).is_some_and(|lhs| op(lhs, rhs))
        };
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::GeometryType(kind) => feature.kind == *kind,
            Self::Has(key) => feature.properties.contains_key(key),
            Self::NotHas(key) => !feature.properties.contains_key(key),
            Self::Eq(key, value) => feature
                .properties
                .get(key)
                .is_some_and(|v| values_equal(v, value)),
            Self::NotEq(key, value) => !feature
                .properties
                .get(key)
                .is_some_and(|v| values_equal(v, value)),
            Self::In(key, values) => feature
                .properties
                .get(key)
                .is_some_and(|v| values.iter().any(|candidate| values_equal(v, candidate))),
            Self::Lt(key, rhs) => compare(key, |a, b| a < b, *rhs),
            Self::Le(key, rhs) => compare(key, |a, b| a <= b, *rhs),
            Self::Gt(key, rhs) => compare(key, |a, b| a > b, *rhs),
            Self::Ge(key, rhs) => compare(key, |a, b| a >= b, *rhs),
            Self::All(filters) => filters.iter().all(|f| f.matches(feature)),
            Self::Any(filters) => filters.iter().any(|f| f.matches(feature)),
            Self::Not(filter) => !filter.matches(feature),
            Self::Custom(predicate) => predicate(feature),
        }
    }
}

impl From<bool> for Filter {
    fn from(value: bool) -> Self {
        if value { Self::Always } else { Self::Never }
    }
}

impl PartialEq for Filter {
    /// Custom predicates are equal only to themselves
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Always, Self::Always) | (Self::Never, Self::Never) => true,
            (Self::GeometryType(a), Self::GeometryType(b)) => a == b,
            (Self::Has(a), Self::Has(b)) | (Self::NotHas(a), Self::NotHas(b)) => a == b,
            (Self::Eq(a, x), Self::Eq(b, y)) | (Self::NotEq(a, x), Self::NotEq(b, y)) => {
                a == b && x == y
            }
            (Self::In(a, x), Self::In(b, y)) => a == b && x == y,
            (Self::Lt(a, x), Self::Lt(b, y))
            | (Self::Le(a, x), Self::Le(b, y))
            | (Self::Gt(a, x), Self::Gt(b, y))
            | (Self::Ge(a, x), Self::Ge(b, y)) => a == b && x == y,
            (Self::All(a), Self::All(b)) | (Self::Any(a), Self::Any(b)) => a == b,
            (Self::Not(a), Self::Not(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Never => write!(f, "Never"),
            Self::GeometryType(kind) => f.debug_tuple("GeometryType").field(kind).finish(),
            Self::Has(key) => f.debug_tuple("Has").field(key).finish(),
            Self::NotHas(key) => f.debug_tuple("NotHas").field(key).finish(),
            Self::Eq(key, value) => f.debug_tuple("Eq").field(key).field(value).finish(),
            Self::NotEq(key, value) => f.debug_tuple("NotEq").field(key).field(value).finish(),
            Self::In(key, values) => f.debug_tuple("In").field(key).field(values).finish(),
            Self::Lt(key, rhs) => f.debug_tuple("Lt").field(key).field(rhs).finish(),
            Self::Le(key, rhs) => f.debug_tuple("Le").field(key).field(rhs).finish(),
            Self::Gt(key, rhs) => f.debug_tuple("Gt").field(key).field(rhs).finish(),
            Self::Ge(key, rhs) => f.debug_tuple("Ge").field(key).field(rhs).finish(),
            Self::All(filters) => f.debug_tuple("All").field(filters).finish(),
            Self::Any(filters) => f.debug_tuple("Any").field(filters).finish(),
            Self::Not(filter) => f.debug_tuple("Not").field(filter).finish(),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Numbers compare by value so `1` matches `1.0`
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Visual part of a style rule
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(default, rename_all = "camelCase")
)]
pub struct Symbol {
    /// Missing color resolves to black
    pub line_color: Option<LineColor>,
    /// Missing opacity resolves to 1.0
    pub line_opacity: Option<f64>,
}

impl Symbol {
    pub fn new(line_color: impl Into<LineColor>) -> Self {
        Self {
            line_color: Some(line_color.into()),
            line_opacity: None,
        }
    }

    pub fn with_opacity(mut self, line_opacity: f64) -> Self {
        self.line_opacity = Some(line_opacity);
        self
    }

    /// Resolve to bytes, scaling every channel (alpha included) by the opacity
    fn resolve(&self) -> Result<Rgba, StyleError> {
        let opacity = self.line_opacity.unwrap_or(1.0);
        if !opacity.is_finite() {
            return Err(StyleError::InvalidOpacity(opacity));
        }
        let channels = match &self.line_color {
            Some(line_color) => line_color.to_channels()?,
            None => [0.0, 0.0, 0.0, 255.0],
        };
        Ok(color::to_rgba(channels.map(|c| c * opacity)))
    }
}

/// A filter paired with the symbol applied when it matches
///
/// A rule without a filter always matches.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StyleRule {
    #[cfg_attr(feature = "serde", serde(default))]
    pub filter: Filter,
    pub symbol: Symbol,
}

impl StyleRule {
    pub fn new(filter: impl Into<Filter>, symbol: Symbol) -> Self {
        Self {
            filter: filter.into(),
            symbol,
        }
    }
}

impl Default for StyleRule {
    /// Always matches, opaque green
    fn default() -> Self {
        Self::new(true, Symbol::new([0.0, 255.0, 0.0]).with_opacity(1.0))
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    filter: Filter,
    color: Rgba,
}

/// Ordered (filter, resolved color) pairs
#[derive(Debug, Clone)]
pub struct CompiledStyle {
    rules: Vec<StyleRule>,
    compiled: Vec<CompiledRule>,
}

impl CompiledStyle {
    /// Compile an ordered list of rules; pass `[rule]` for a single one
    pub fn compile<I>(rules: I) -> Result<Self, StyleError>
    where
        I: IntoIterator<Item = StyleRule>,
    {
        let rules: Vec<StyleRule> = rules.into_iter().collect();
        let compiled = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    filter: rule.filter.clone(),
                    color: rule.symbol.resolve()?,
                })
            })
            .collect::<Result<Vec<_>, StyleError>>()?;
        Ok(Self { rules, compiled })
    }

    /// The rules this style was compiled from
    #[inline]
    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    /// Color of the first rule whose filter matches, or opaque black
    pub fn resolve_color(&self, feature: &FilterFeature<'_>) -> Rgba {
        self.compiled
            .iter()
            .find(|rule| rule.filter.matches(feature))
            .map_or(NO_MATCH_COLOR, |rule| rule.color)
    }

    pub fn resolve_trip(&self, trip: &Trip) -> Rgba {
        self.resolve_color(&FilterFeature::new(
            GeometryKind::LineString,
            trip.properties(),
        ))
    }
}

impl Default for CompiledStyle {
    fn default() -> Self {
        let rule = StyleRule::default();
        let color = [0, 255, 0, 255];
        Self {
            compiled: vec![CompiledRule {
                filter: rule.filter.clone(),
                color,
            }],
            rules: vec![rule],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap_or_default()
    }

    fn line(properties: &Properties) -> FilterFeature<'_> {
        FilterFeature::new(GeometryKind::LineString, properties)
    }

    #[test]
    fn test_default_style_is_opaque_green() {
        let style = CompiledStyle::default();
        let compiled = CompiledStyle::compile([StyleRule::default()]).unwrap();
        let empty = Properties::new();
        assert_eq!(style.resolve_color(&line(&empty)), [0, 255, 0, 255]);
        assert_eq!(compiled.resolve_color(&line(&empty)), [0, 255, 0, 255]);
    }

    #[test]
    fn test_opacity_scales_all_channels() {
        let symbol = Symbol::new([255.0, 0.0, 0.0]).with_opacity(0.5);
        let style = CompiledStyle::compile([StyleRule::new(true, symbol)]).unwrap();
        let empty = Properties::new();
        assert_eq!(style.resolve_color(&line(&empty)), [128, 0, 0, 128]);
    }

    #[test]
    fn test_first_match_wins() {
        let style = CompiledStyle::compile([
            StyleRule::new(Filter::equals("vendor", 1), Symbol::new("red")),
            StyleRule::new(Filter::Has("vendor".into()), Symbol::new("blue")),
            StyleRule::new(true, Symbol::new("white")),
        ])
        .unwrap();

        assert_eq!(
            style.resolve_color(&line(&props(json!({ "vendor": 1.0 })))),
            [255, 0, 0, 255]
        );
        assert_eq!(
            style.resolve_color(&line(&props(json!({ "vendor": 2 })))),
            [0, 0, 255, 255]
        );
        assert_eq!(
            style.resolve_color(&line(&Properties::new())),
            [255, 255, 255, 255]
        );
    }

    #[test]
    fn test_no_match_is_opaque_black() {
        let style = CompiledStyle::compile([StyleRule::new(false, Symbol::new("red"))]).unwrap();
        assert_eq!(style.resolve_color(&line(&Properties::new())), [0, 0, 0, 255]);
        let empty = CompiledStyle::compile(Vec::new()).unwrap();
        assert_eq!(empty.resolve_color(&line(&Properties::new())), [0, 0, 0, 255]);
    }

    #[test]
    fn test_missing_color_is_black() {
        let symbol = Symbol {
            line_color: None,
            line_opacity: Some(0.5),
        };
        let style = CompiledStyle::compile([StyleRule::new(true, symbol)]).unwrap();
        assert_eq!(style.resolve_color(&line(&Properties::new())), [0, 0, 0, 128]);
    }

    #[test]
    fn test_invalid_color_fails_compile() {
        let result = CompiledStyle::compile([StyleRule::new(true, Symbol::new("chartreuse-ish"))]);
        assert!(matches!(result, Err(StyleError::InvalidColor(_))));
        let result = CompiledStyle::compile([StyleRule::new(
            true,
            Symbol::new("red").with_opacity(f64::NAN),
        )]);
        assert!(matches!(result, Err(StyleError::InvalidOpacity(_))));
    }

    #[test]
    fn test_filter_variants() {
        let p = props(json!({ "speed": 12.5, "kind": "bus" }));
        let multi = FilterFeature::new(GeometryKind::MultiLineString, &p);

        assert!(Filter::GeometryType(GeometryKind::MultiLineString).matches(&multi));
        assert!(!Filter::GeometryType(GeometryKind::LineString).matches(&multi));
        assert!(Filter::Gt("speed".into(), 10.0).matches(&multi));
        assert!(!Filter::Lt("speed".into(), 10.0).matches(&multi));
        assert!(!Filter::Ge("kind".into(), 0.0).matches(&multi));
        assert!(Filter::In("kind".into(), vec![json!("tram"), json!("bus")]).matches(&multi));
        assert!(Filter::NotEq("kind".into(), json!("tram")).matches(&multi));
        assert!(Filter::NotHas("route".into()).matches(&multi));
        assert!(
            Filter::All(vec![Filter::Has("kind".into()), Filter::Le("speed".into(), 12.5)])
                .matches(&multi)
        );
        assert!(Filter::Any(vec![Filter::Never, Filter::Always]).matches(&multi));
        assert!(Filter::Not(Box::new(Filter::Never)).matches(&multi));
        assert!(Filter::custom(|f| f.properties.len() == 2).matches(&multi));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let style = CompiledStyle::compile([StyleRule::new(
            Filter::equals("kind", "bus"),
            Symbol::new("#336699").with_opacity(0.3),
        )])
        .unwrap();
        let p = props(json!({ "kind": "bus" }));
        let first = style.resolve_color(&line(&p));
        let second = style.resolve_color(&line(&p));
        assert_eq!(first, second);
    }
}

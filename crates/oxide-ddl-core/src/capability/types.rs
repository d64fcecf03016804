//! Declared-type normalization and classification.
//!
//! Declared types are kept as written in the schema model. Everything that
//! needs to reason about a type goes through [`base_type`] (strip modifiers
//! and array suffixes) and [`canonical_type`] (fold spelling aliases).

use crate::schema::TypeAffinity;

/// Lower-cases a declared type and strips parenthesized modifiers and array
/// suffixes: `VARCHAR(255)[]` → `varchar`,
/// `timestamp(3) with time zone` → `timestamp with time zone`.
#[must_use]
pub fn base_type(declared: &str) -> String {
    let mut out = String::with_capacity(declared.len());
    let mut depth = 0usize;
    for ch in declared.chars() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch.to_ascii_lowercase()),
            _ => {}
        }
    }
    let mut words: Vec<&str> = out.split_whitespace().collect();
    if words.last() == Some(&"array") {
        words.pop();
    }
    words.join(" ")
}

/// Whether the declared type is an array (`text[]`, `integer ARRAY`).
#[must_use]
pub fn is_array_type(declared: &str) -> bool {
    let trimmed = declared.trim_end();
    trimmed.ends_with(']') || trimmed.to_ascii_lowercase().ends_with(" array")
}

/// Folds alias spellings of a base type onto one canonical name.
#[must_use]
pub fn canonical_type(base: &str) -> &str {
    match base {
        "int" | "int4" => "integer",
        "int2" => "smallint",
        "int8" => "bigint",
        "float4" => "real",
        "float8" | "double" | "float" => "double precision",
        "decimal" => "numeric",
        "bool" => "boolean",
        "character varying" => "varchar",
        "character" | "bpchar" => "char",
        "timestamp without time zone" => "timestamp",
        "timestamp with time zone" => "timestamptz",
        "time without time zone" => "time",
        "time with time zone" => "timetz",
        "serial4" => "serial",
        "serial2" => "smallserial",
        "serial8" => "bigserial",
        other => other,
    }
}

/// Base type reduced to its canonical spelling.
#[must_use]
pub fn normalized(declared: &str) -> String {
    canonical_type(&base_type(declared)).to_string()
}

/// Numeric modifiers of a declared type: `numeric(10, 2)` → `[10, 2]`.
#[must_use]
pub fn type_modifiers(declared: &str) -> Vec<u32> {
    let Some(open) = declared.find('(') else {
        return Vec::new();
    };
    let Some(close) = declared[open..].find(')') else {
        return Vec::new();
    };
    declared[open + 1..open + close]
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

/// SQLite type affinity, following SQLite's name-matching rules.
#[must_use]
pub fn affinity(declared: &str) -> TypeAffinity {
    let ty = declared.to_ascii_lowercase();
    if ty.contains("int") {
        TypeAffinity::Integer
    } else if ty.contains("char") || ty.contains("clob") || ty.contains("text") {
        TypeAffinity::Text
    } else if ty.contains("blob") || ty.trim().is_empty() {
        TypeAffinity::Blob
    } else if ty.contains("real") || ty.contains("floa") || ty.contains("doub") {
        TypeAffinity::Real
    } else {
        TypeAffinity::Numeric
    }
}

/// Integer types, including serial pseudo-types.
#[must_use]
pub fn is_integer(canonical: &str) -> bool {
    matches!(
        canonical,
        "smallint" | "integer" | "bigint" | "tinyint" | "mediumint"
    ) || is_serial(canonical)
}

/// Serial pseudo-types.
#[must_use]
pub fn is_serial(canonical: &str) -> bool {
    matches!(canonical, "serial" | "bigserial" | "smallserial")
}

/// The integer type a serial pseudo-type expands to.
#[must_use]
pub fn serial_base(canonical: &str) -> Option<&'static str> {
    match canonical {
        "smallserial" => Some("smallint"),
        "serial" => Some("integer"),
        "bigserial" => Some("bigint"),
        _ => None,
    }
}

/// The serial pseudo-type for an integer type.
#[must_use]
pub fn serial_for(canonical: &str) -> Option<&'static str> {
    match canonical {
        "smallint" => Some("SMALLSERIAL"),
        "integer" => Some("SERIAL"),
        "bigint" => Some("BIGSERIAL"),
        _ => None,
    }
}

/// UUID.
#[must_use]
pub fn is_uuid(canonical: &str) -> bool {
    canonical == "uuid"
}

/// JSON or JSONB.
#[must_use]
pub fn is_json(canonical: &str) -> bool {
    matches!(canonical, "json" | "jsonb")
}

/// Built-in range and multirange types.
#[must_use]
pub fn is_range(canonical: &str) -> bool {
    matches!(
        canonical,
        "int4range"
            | "int8range"
            | "numrange"
            | "tsrange"
            | "tstzrange"
            | "daterange"
            | "int4multirange"
            | "int8multirange"
            | "nummultirange"
            | "tsmultirange"
            | "tstzmultirange"
            | "datemultirange"
    )
}

/// Network address types.
#[must_use]
pub fn is_network(canonical: &str) -> bool {
    matches!(canonical, "inet" | "cidr" | "macaddr" | "macaddr8")
}

/// Geometric and spatial types.
#[must_use]
pub fn is_geometry(canonical: &str) -> bool {
    matches!(
        canonical,
        "point" | "line" | "lseg" | "box" | "path" | "polygon" | "circle" | "geometry" | "geography"
    )
}

/// Character types that accept string defaults without a cast.
#[must_use]
pub fn is_textual(canonical: &str) -> bool {
    matches!(canonical, "text" | "varchar" | "char" | "citext" | "string")
}

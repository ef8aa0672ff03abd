//! Geometry predicates
//!
//! The comparand is GeoJSON, bound as a string through the single
//! placeholder of each fragment: `$1` on Postgres, `?` elsewhere, which is
//! what `Expr::cust_with_values` expects from each query builder.

use super::Dialect;

impl Dialect {
    fn geometry_from_json(&self) -> &'static str {
        match self {
            Dialect::Postgres => "ST_GeomFromGeoJSON($1)",
            Dialect::Mysql => "ST_GeomFromGeoJSON(?)",
            Dialect::Sqlite => "GeomFromGeoJSON(?)",
        }
    }

    /// `column` intersects the bound geometry
    pub fn intersects(&self, column_sql: &str) -> String {
        let geometry = self.geometry_from_json();
        match self {
            Dialect::Postgres | Dialect::Mysql => format!("ST_Intersects({}, {})", column_sql, geometry),
            Dialect::Sqlite => format!("Intersects({}, {})", column_sql, geometry),
        }
    }

    /// `column` does not intersect the bound geometry
    pub fn nintersects(&self, column_sql: &str) -> String {
        format!("NOT {}", self.intersects(column_sql))
    }

    /// Bounding box of `column` intersects the bound geometry
    pub fn intersects_bbox(&self, column_sql: &str) -> String {
        let geometry = self.geometry_from_json();
        match self {
            Dialect::Postgres => format!("{} && {}", column_sql, geometry),
            Dialect::Mysql => format!("MBRIntersects({}, {})", column_sql, geometry),
            Dialect::Sqlite => format!("MbrIntersects({}, {})", column_sql, geometry),
        }
    }

    /// Bounding box of `column` does not intersect the bound geometry
    pub fn nintersects_bbox(&self, column_sql: &str) -> String {
        format!("NOT ({})", self.intersects_bbox(column_sql))
    }
}

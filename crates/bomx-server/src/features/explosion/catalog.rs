//! Artifact catalog
//!
//! Static mapping from artifact type to the query strategy that produces
//! its rows. Supply rules come from a literal join query with no parameter;
//! the four plan datasets come from set-returning procedures parameterized
//! by the workflow version.

use bomx_common::status::ArtifactType;

/// How one artifact type's rows are fetched from the relational source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStrategy {
    /// Literal SQL text, no parameter.
    Literal(&'static str),
    /// Named set-returning procedure taking the version as its parameter.
    Procedure(&'static str),
}

const SUPPLY_RULES_SQL: &str = "\
SELECT r.material_code, r.plant_code, r.supplier_code, r.source_type,
       r.priority, r.lot_size, r.lead_time_days
FROM supply_rules r
INNER JOIN materials m ON m.material_code = r.material_code
ORDER BY r.material_code, r.priority";

/// Query strategy for the given artifact type.
pub fn strategy_for(artifact_type: ArtifactType) -> QueryStrategy {
    match artifact_type {
        ArtifactType::SupplyRules => QueryStrategy::Literal(SUPPLY_RULES_SQL),
        ArtifactType::ProductionModelSemiFinished => {
            QueryStrategy::Procedure("explosion_production_model_semis")
        }
        ArtifactType::RawMaterialSemiFinished => {
            QueryStrategy::Procedure("explosion_raw_material_semis")
        }
        ArtifactType::SalesPlan => QueryStrategy::Procedure("explosion_sales_plan"),
        ArtifactType::ProductionPlan => QueryStrategy::Procedure("explosion_production_plan"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_a_strategy() {
        let mut literal = 0;
        let mut procedure = 0;
        for t in ArtifactType::ALL {
            match strategy_for(t) {
                QueryStrategy::Literal(sql) => {
                    assert!(sql.contains("SELECT"));
                    literal += 1;
                }
                QueryStrategy::Procedure(name) => {
                    assert!(!name.is_empty());
                    procedure += 1;
                }
            }
        }
        assert_eq!(literal, 1);
        assert_eq!(procedure, 4);
    }

    #[test]
    fn test_sales_plan_uses_its_procedure() {
        assert_eq!(
            strategy_for(ArtifactType::SalesPlan),
            QueryStrategy::Procedure("explosion_sales_plan")
        );
    }
}

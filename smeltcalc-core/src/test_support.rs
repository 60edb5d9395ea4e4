use crate::catalog::MaterialCatalog;
use smeltcalc_schemas::material::{IngredientRange, MaterialAmounts, MaterialRecord};

pub(crate) fn ing(id: &str, min: f64, max: f64) -> IngredientRange {
    IngredientRange::new(id, min, max)
}

/// The TerraFirmaCraft data set, built in code so unit tests do not touch disk.
pub(crate) fn tfc_catalog() -> MaterialCatalog {
    let mut records = Vec::new();
    for (id, name) in [
        ("copper", "Copper"),
        ("zinc", "Zinc"),
        ("bismuth", "Bismuth"),
        ("silver", "Silver"),
        ("gold", "Gold"),
        ("nickel", "Nickel"),
        ("pig_iron", "Pig Iron"),
    ] {
        records.push(MaterialRecord::base(id, name));
    }

    records.push(MaterialRecord::single_pass("steel", "Steel", "pig_iron"));

    records.push(MaterialRecord::alloy(
        "bismuth_bronze",
        "Bismuth Bronze",
        vec![ing("zinc", 20.0, 30.0), ing("copper", 50.0, 65.0), ing("bismuth", 10.0, 20.0)],
    ));
    records.push(MaterialRecord::alloy(
        "black_bronze",
        "Black Bronze",
        vec![ing("copper", 50.0, 70.0), ing("silver", 10.0, 25.0), ing("gold", 10.0, 25.0)],
    ));
    records.push(MaterialRecord::alloy(
        "brass",
        "Brass",
        vec![ing("copper", 88.0, 92.0), ing("zinc", 8.0, 12.0)],
    ));
    records.push(MaterialRecord::alloy(
        "rose_gold",
        "Rose Gold",
        vec![ing("copper", 15.0, 30.0), ing("gold", 70.0, 85.0)],
    ));
    records.push(MaterialRecord::alloy(
        "sterling_silver",
        "Sterling Silver",
        vec![ing("copper", 20.0, 40.0), ing("silver", 60.0, 80.0)],
    ));

    records.push(MaterialRecord::alloy(
        "raw_black_steel",
        "Raw Black Steel",
        vec![ing("steel", 50.0, 70.0), ing("nickel", 15.0, 25.0), ing("black_bronze", 15.0, 25.0)],
    ));
    records.push(MaterialRecord::alloy(
        "raw_blue_steel",
        "Raw Blue Steel",
        vec![
            ing("black_steel", 50.0, 55.0),
            ing("steel", 20.0, 25.0),
            ing("bismuth_bronze", 10.0, 15.0),
            ing("sterling_silver", 10.0, 15.0),
        ],
    ));
    records.push(MaterialRecord::alloy(
        "raw_red_steel",
        "Raw Red Steel",
        vec![
            ing("black_steel", 50.0, 55.0),
            ing("steel", 20.0, 25.0),
            ing("brass", 10.0, 15.0),
            ing("rose_gold", 10.0, 15.0),
        ],
    ));

    records.push(MaterialRecord::composite(
        "black_steel",
        "Black Steel",
        "raw_black_steel",
        "pig_iron",
    ));
    records.push(MaterialRecord::composite(
        "blue_steel",
        "Blue Steel",
        "raw_blue_steel",
        "black_steel",
    ));
    records.push(MaterialRecord::composite(
        "red_steel",
        "Red Steel",
        "raw_red_steel",
        "black_steel",
    ));

    MaterialCatalog::from_records(records)
}

pub(crate) fn amounts(entries: &[(&str, f64)]) -> MaterialAmounts {
    entries.iter().map(|(id, v)| (id.to_string(), *v)).collect()
}

pub(crate) fn assert_amounts_eq(got: &MaterialAmounts, want: &MaterialAmounts, eps: f64) {
    assert_eq!(
        got.len(),
        want.len(),
        "key sets differ: got {:?}, want {:?}",
        got,
        want
    );
    for (id, expected) in want {
        let actual = got
            .get(id)
            .unwrap_or_else(|| panic!("missing {} in {:?}", id, got));
        assert!(
            (actual - expected).abs() <= eps,
            "{}: got {}, want {} (full result {:?})",
            id,
            actual,
            expected,
            got
        );
    }
}

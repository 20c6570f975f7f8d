use std::collections::BTreeSet;

use kraftwerk_core::union_frames;
use kraftwerk_core::values::cell_string;
use polars::prelude::{Column, DataFrame};
use proptest::prelude::*;

fn frame(ids: &BTreeSet<String>, column: &str) -> DataFrame {
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    let values: Vec<i64> = (0..ids.len() as i64).collect();
    DataFrame::new(vec![
        Column::new("IdUE".into(), ids),
        Column::new(column.into(), values),
    ])
    .unwrap()
}

proptest! {
    #[test]
    fn union_keeps_every_identifier(
        cawi in prop::collection::btree_set("[A-Z][0-9]{1,3}", 0..20),
        papi in prop::collection::btree_set("[A-Z][0-9]{1,3}", 0..20),
    ) {
        let union = union_frames(&[frame(&cawi, "AGE"), frame(&papi, "CAR")]).unwrap();
        prop_assert_eq!(union.height(), cawi.len() + papi.len());

        let found: BTreeSet<String> = (0..union.height())
            .filter_map(|idx| cell_string(&union, "IdUE", idx))
            .collect();
        let expected: BTreeSet<String> = cawi.union(&papi).cloned().collect();
        prop_assert_eq!(found, expected);
    }
}

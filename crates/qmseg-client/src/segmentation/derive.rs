use crate::segmentation::types::{DerivedRecord, ItemRecord};

pub fn monetary_value(item: &ItemRecord) -> f64 {
    item.amount - item.cost
}

pub fn derive_profitability(items: Vec<ItemRecord>) -> Vec<DerivedRecord> {
    items
        .into_iter()
        .enumerate()
        .map(|(row, item)| DerivedRecord {
            row,
            monetary_value: monetary_value(&item),
            item,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{derive_profitability, monetary_value};
    use crate::segmentation::types::ItemRecord;

    fn item(item_no: &str, amount: f64, cost: f64) -> ItemRecord {
        ItemRecord {
            item_no: item_no.to_string(),
            status: String::new(),
            quantity: 1.0,
            amount,
            cost,
            days: 100,
            count: 1,
            department: None,
        }
    }

    #[test]
    fn monetary_value_is_amount_minus_cost() {
        assert_eq!(monetary_value(&item("10010", 250.5, 100.25)), 150.25);
        assert_eq!(monetary_value(&item("10011", 10.0, 40.0)), -30.0);
        assert_eq!(monetary_value(&item("10012", 0.0, 0.0)), 0.0);
    }

    #[test]
    fn derivation_keeps_order_and_is_repeatable() {
        let items = vec![item("10010", 5.0, 2.0), item("10011", 7.0, 1.5)];
        let first = derive_profitability(items.clone());
        let second = derive_profitability(items);

        assert_eq!(first, second);
        assert_eq!(first[0].row, 0);
        assert_eq!(first[1].row, 1);
        assert_eq!(first[1].item.item_no, "10011");
        assert_eq!(first[1].monetary_value, 5.5);
    }
}

use crate::segmentation::types::{CohortKey, DerivedRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesSplit {
    pub with_sales: Vec<DerivedRecord>,
    pub without_sales: Vec<DerivedRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cohort<'a> {
    pub key: CohortKey,
    pub members: Vec<&'a DerivedRecord>,
}

pub fn split_by_sales(records: Vec<DerivedRecord>) -> SalesSplit {
    let (with_sales, without_sales) = records
        .into_iter()
        .partition::<Vec<DerivedRecord>, _>(|record| record.item.count != 0);
    SalesSplit {
        with_sales,
        without_sales,
    }
}

/// Partitions the with-sales population into scoring cohorts. Departments
/// keep the order in which they first appear in the record set.
pub fn sales_cohorts(with_sales: &[DerivedRecord], department_grouping: bool) -> Vec<Cohort<'_>> {
    if !department_grouping {
        if with_sales.is_empty() {
            return Vec::new();
        }
        return vec![Cohort {
            key: CohortKey::All,
            members: with_sales.iter().collect(),
        }];
    }

    let mut cohorts: Vec<Cohort<'_>> = Vec::new();
    for record in with_sales {
        let key = department_key(record.item.department.as_deref());
        match cohorts.iter_mut().find(|cohort| cohort.key == key) {
            Some(cohort) => cohort.members.push(record),
            None => cohorts.push(Cohort {
                key,
                members: vec![record],
            }),
        }
    }

    cohorts.retain(|cohort| !cohort.members.is_empty());
    cohorts
}

fn department_key(department: Option<&str>) -> CohortKey {
    match department.map(str::trim).filter(|value| !value.is_empty()) {
        Some(name) => CohortKey::Department(name.to_string()),
        None => CohortKey::Unassigned,
    }
}

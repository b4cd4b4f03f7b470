//! Field selection for one marshalling call

use std::collections::BTreeSet;

use crate::schema::FieldDescriptor;

/// Which descriptors a call processes.
///
/// `skip` and `only` entries match either the document key or the
/// attribute of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub skip: BTreeSet<String>,
    /// Empty means every field
    pub only: BTreeSet<String>,
    pub include_relations: bool,
    pub include_generated: bool,
    pub include_secret: bool,
}

impl FieldFilter {
    /// Defaults for document → record: no relations, no generated ids
    pub fn for_deserialization() -> Self {
        Self {
            skip: BTreeSet::new(),
            only: BTreeSet::new(),
            include_relations: false,
            include_generated: false,
            include_secret: true,
        }
    }

    /// Defaults for record → document: no secrets
    pub fn for_serialization() -> Self {
        Self {
            skip: BTreeSet::new(),
            only: BTreeSet::new(),
            include_relations: true,
            include_generated: true,
            include_secret: false,
        }
    }

    pub fn skip<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_relations(mut self, include: bool) -> Self {
        self.include_relations = include;
        self
    }

    pub fn with_generated(mut self, include: bool) -> Self {
        self.include_generated = include;
        self
    }

    pub fn with_secret(mut self, include: bool) -> Self {
        self.include_secret = include;
        self
    }

    /// Whether `field` passes every rule
    pub fn admits(&self, field: &FieldDescriptor) -> bool {
        if self.skip.contains(&field.json_key) || self.skip.contains(&field.attribute) {
            return false;
        }

        if !self.only.is_empty()
            && !self.only.contains(&field.json_key)
            && !self.only.contains(&field.attribute)
        {
            return false;
        }

        if field.is_secret() && !self.include_secret {
            return false;
        }

        if field.is_relation() && !self.include_relations {
            return false;
        }

        !(field.is_generated() && !self.include_generated)
    }

    /// Admitted descriptors, in input order
    pub fn select<'a, I>(&self, fields: I) -> Vec<&'a FieldDescriptor>
    where
        I: IntoIterator<Item = &'a FieldDescriptor>,
    {
        fields.into_iter().filter(|f| self.admits(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDecl;

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::from_decl(FieldDecl::generated_id("id"), "id".into()),
            FieldDescriptor::from_decl(FieldDecl::plain("first_name"), "firstName".into()),
            FieldDescriptor::from_decl(FieldDecl::secret("passwd"), "passwd".into()),
            FieldDescriptor::from_decl(FieldDecl::relation("company", "company"), "companyId".into()),
        ]
    }

    fn keys(selected: &[&FieldDescriptor]) -> Vec<String> {
        selected.iter().map(|f| f.json_key.clone()).collect()
    }

    #[test]
    fn test_deserialization_defaults() {
        let fields = fields();
        let selected = FieldFilter::for_deserialization().select(&fields);
        assert_eq!(keys(&selected), vec!["firstName", "passwd"]);
    }

    #[test]
    fn test_serialization_defaults() {
        let fields = fields();
        let selected = FieldFilter::for_serialization().select(&fields);
        assert_eq!(keys(&selected), vec!["id", "firstName", "companyId"]);
    }

    #[test]
    fn test_skip_matches_key_or_attribute() {
        let fields = fields();
        let by_key = FieldFilter::for_serialization().skip(["firstName"]);
        let by_attribute = FieldFilter::for_serialization().skip(["first_name"]);
        assert_eq!(keys(&by_key.select(&fields)), vec!["id", "companyId"]);
        assert_eq!(by_key.select(&fields), by_attribute.select(&fields));
    }

    #[test]
    fn test_only_restricts() {
        let fields = fields();
        let filter = FieldFilter::for_serialization().only(["company", "id"]);
        assert_eq!(keys(&filter.select(&fields)), vec!["id", "companyId"]);
    }

    #[test]
    fn test_only_does_not_override_category_rules() {
        let fields = fields();
        let filter = FieldFilter::for_serialization().only(["passwd"]);
        assert!(filter.select(&fields).is_empty());
        assert_eq!(keys(&filter.with_secret(true).select(&fields)), vec!["passwd"]);
    }

    #[test]
    fn test_select_is_idempotent() {
        let fields = fields();
        let filters = [
            FieldFilter::for_deserialization(),
            FieldFilter::for_serialization(),
            FieldFilter::for_serialization().skip(["id"]).only(["id", "firstName"]),
        ];

        for filter in filters {
            let once = filter.select(&fields);
            let twice = filter.select(once.iter().copied());
            assert_eq!(once, twice);
        }
    }
}

use rtquery::fields::BuiltinOptions;
use rtquery::{ConditionParser, Filter, FilterSyntaxError, Item, Registry, parse};
use serde_json::json;

fn registry() -> Registry {
    Registry::with_builtins(&BuiltinOptions::default()).expect("built-ins register")
}

fn sample_items() -> Vec<Item> {
    [
        json!({"name": "Ubuntu 24.04 ISO", "size": 6_000_000_000u64, "ratio": 2500, "is_complete": true, "tagged": "linux iso", "alias": "UBU"}),
        json!({"name": "Debian netinst", "size": 600_000_000u64, "ratio": 400, "is_complete": false, "tagged": "", "alias": "DEB"}),
        json!({"name": "Some.Show.S01E02.720p.mkv", "size": 1_200_000_000u64, "ratio": 1000, "is_complete": true, "tagged": "tv", "alias": "TV"}),
        json!({"name": "flac album", "size": 400_000_000u64, "ratio": 0, "is_complete": false, "tagged": "music new", "alias": "MUS"}),
    ]
    .into_iter()
    .map(|raw| Item::from_json(raw).expect("item object"))
    .collect()
}

fn matching(filter: &Filter, items: &[Item]) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| filter.matches(item).expect("fields readable").then_some(idx))
        .collect()
}

#[test]
fn test_single_field_disjunctions_round_trip_exactly() {
    let registry = registry();
    let parser = ConditionParser::new(&registry);
    for expr in [
        "name=foo",
        "name=foo,bar,baz",
        "size=+1g ratio=-1",
        "tagged=tv,linux alias=UBU,DEB is_complete=yes",
        "kind=flac,mp3",
    ] {
        let filter = parser.parse(expr).expect("valid condition");
        assert_eq!(filter.to_string(), expr);
    }
}

#[test]
fn test_group_with_or_is_all_of_leaf_and_any() {
    let registry = registry();
    let filter = ConditionParser::new(&registry)
        .parse("size=1 [ ratio=2 OR done=3 ]")
        .expect("valid condition");

    let Filter::All(members) = &filter else {
        panic!("expected All, got {filter:?}");
    };
    assert_eq!(members.len(), 2);
    assert!(members[0].leaf_parts().is_some());
    let Filter::Any(alternatives) = &members[1] else {
        panic!("expected Any, got {:?}", members[1]);
    };
    assert_eq!(alternatives.len(), 2);
    assert!(alternatives.iter().all(|alt| alt.leaf_parts().is_some()));
    assert_eq!(filter.to_string(), "size=1 [ ratio=2 OR done=3 ]");
}

#[test]
fn test_top_level_or_builds_any_of_runs() {
    let registry = registry();
    let filter = ConditionParser::new(&registry)
        .parse("is_complete=no size=-1g OR alias=TV")
        .expect("valid condition");

    let Filter::Any(runs) = &filter else {
        panic!("expected Any, got {filter:?}");
    };
    assert!(matches!(&runs[0], Filter::All(members) if members.len() == 2));
    assert!(runs[1].leaf_parts().is_some());
    assert_eq!(matching(&filter, &sample_items()), vec![1, 2, 3]);
}

#[test]
fn test_structural_errors() {
    let registry = registry();
    let parser = ConditionParser::new(&registry);

    assert!(matches!(parser.parse("name=a OR"), Err(FilterSyntaxError::MissingRightOperand(_))));
    assert!(matches!(parser.parse("OR name=a"), Err(FilterSyntaxError::MissingLeftOperand(_))));
    assert!(matches!(
        parser.parse("name=a OR OR name=b"),
        Err(FilterSyntaxError::MissingLeftOperand(_))
    ));
    assert!(matches!(parser.parse("[ name=a"), Err(FilterSyntaxError::TooManyOpening(_))));
    assert!(matches!(parser.parse("name=a ]"), Err(FilterSyntaxError::TooManyClosing(_))));
    assert!(matches!(parser.parse(""), Err(FilterSyntaxError::Empty)));
    assert!(matches!(parser.parse("[ ]"), Err(FilterSyntaxError::Empty)));
    assert!(matches!(parser.parse("NOT"), Err(FilterSyntaxError::DanglingNot)));
    assert!(matches!(parser.parse("foo"), Err(FilterSyntaxError::MissingFieldName(_))));
}

#[test]
fn test_bracket_errors_name_the_whole_condition() {
    let registry = registry();
    let err = ConditionParser::new(&registry)
        .parse("name=a [ size=+1")
        .unwrap_err();
    assert!(err.to_string().contains("'name=a [ size=+1'"), "{err}");
}

#[test]
fn test_unknown_and_unusable_fields() {
    let err = parse("nosuchfield=1", None).unwrap_err();
    assert!(matches!(
        &err,
        FilterSyntaxError::UnknownField { field, .. } if field == "nosuchfield"
    ));
    assert!(err.to_string().contains("nosuchfield"));

    let registry = Registry::new();
    registry
        .register(rtquery::FieldDescriptor::constant(
            rtquery::ValueType::Text,
            "label",
            "display only",
        ))
        .expect("unique name");
    let err = ConditionParser::new(&registry).parse("label=x").unwrap_err();
    assert!(matches!(err, FilterSyntaxError::NotFilterable { field } if field == "label"));
}

#[test]
fn test_bad_literal_names_field_and_literal() {
    let err = parse("is_complete=maybe", None).unwrap_err();
    assert_eq!(err.field(), Some("is_complete"));
    assert!(err.to_string().contains("is_complete=maybe"));

    let err = parse("kind_101=flac", None).unwrap_err();
    assert!(err.to_string().contains("101 > 100"), "{err}");
}

#[test]
fn test_default_field() {
    let registry = registry();
    let parser = ConditionParser::new(&registry).with_default_field(Some("name"));
    let filter = parser.parse("*ubuntu*").expect("valid condition");
    assert_eq!(filter.to_string(), "name=*ubuntu*");
    assert_eq!(matching(&filter, &sample_items()), vec![0]);
}

#[test]
fn test_inline_operators() {
    let registry = registry();
    let parser = ConditionParser::new(&registry);
    let items = sample_items();

    let cases = [
        ("size>1g", "size=+1g", vec![0, 2]),
        ("size<1g", "size=-1g", vec![1, 3]),
        ("ratio>=1", "ratio=!-1", vec![0, 2]),
        ("ratio<=1", "ratio=!+1", vec![1, 2, 3]),
        ("alias!=TV", "alias=!TV", vec![0, 1, 3]),
        ("alias<>TV", "alias=!TV", vec![0, 1, 3]),
        ("name~s\\d+e\\d+", r#""name=/s\\d+e\\d+/""#, vec![2]),
    ];
    for (condition, canonical, expected) in cases {
        let filter = parser
            .parse_tokens(&[condition])
            .unwrap_or_else(|e| panic!("{condition}: {e}"));
        assert_eq!(filter.to_string(), canonical, "{condition}");
        assert_eq!(matching(&filter, &items), expected, "{condition}");
    }
}

#[test]
fn test_inline_operator_rejects_signed_values() {
    let err = parse("size>+1g", None).unwrap_err();
    assert!(matches!(err, FilterSyntaxError::AmbiguousSign { sign: '+', .. }));
    let err = parse("size<-1g", None).unwrap_err();
    assert!(matches!(err, FilterSyntaxError::AmbiguousSign { sign: '-', .. }));
}

#[test]
fn test_negation() {
    let registry = registry();
    let parser = ConditionParser::new(&registry);
    let items = sample_items();

    let filter = parser.parse("is_complete=!yes").expect("valid condition");
    assert_eq!(filter.to_string(), "is_complete=!yes");
    assert_eq!(matching(&filter, &items), vec![1, 3]);

    let filter = parser.parse("NOT alias=UBU,DEB").expect("valid condition");
    assert!(matches!(filter, Filter::Not(_)));
    assert_eq!(matching(&filter, &items), vec![2, 3]);

    let filter = parser.parse("size=+1g [ NOT alias=TV ]").expect("valid condition");
    assert_eq!(matching(&filter, &items), vec![0]);
}

#[test]
fn test_quoted_values_keep_spaces() {
    let registry = registry();
    let filter = ConditionParser::new(&registry)
        .parse("name='ubuntu 24*'")
        .expect("valid condition");
    assert_eq!(matching(&filter, &sample_items()), vec![0]);

    let err = ConditionParser::new(&registry).parse("name='ubuntu").unwrap_err();
    assert!(matches!(err, FilterSyntaxError::UnterminatedQuote(_)));
}

#[test]
fn test_commas_inside_regex_do_not_split() {
    let registry = registry();
    let filter = ConditionParser::new(&registry)
        .parse("name=/^(flac|x{1,2})/,debian*")
        .expect("valid condition");
    let Filter::All(conditions) = &filter else {
        panic!("expected All, got {filter:?}");
    };
    let [Filter::Any(members)] = conditions.as_slice() else {
        panic!("expected a single Any, got {conditions:?}");
    };
    assert_eq!(members.len(), 2);
    assert_eq!(matching(&filter, &sample_items()), vec![1, 3]);
}

#[test]
fn test_canonical_string_reparses_to_equivalent_filter() {
    let registry = registry();
    let parser = ConditionParser::new(&registry);
    let items = sample_items();

    for expr in [
        "size>1g OR [ NOT is_complete=y tagged=new ]",
        "NOT [ alias=TV OR ratio<1 ] name=*i*",
        "tagged=!linux,tv size=-2g",
        "[ [ alias=UBU ] OR [ alias=DEB size<1g ] ]",
        "is_complete=1 OR tagged= OR name=/album$/",
        "name='ubuntu 24*' OR alias=TV",
        "name='ubuntu 24*',*album",
        "NOT name='flac album'",
        r"name='/^s\w+\.show/'",
        r#"name='*"quoted"*' OR alias=DEB"#,
    ] {
        let first = parser.parse(expr).expect("valid condition");
        let canonical = first.to_string();
        let second = parser
            .parse(&canonical)
            .unwrap_or_else(|e| panic!("{canonical}: {e}"));
        assert_eq!(matching(&first, &items), matching(&second, &items), "{expr} vs {canonical}");
    }
}

#[test]
fn test_token_list_and_string_agree() {
    let registry = registry();
    let parser = ConditionParser::new(&registry);
    let from_string = parser.parse("[ alias=TV OR size>5g ] is_complete=yes").expect("valid");
    let from_tokens = parser
        .parse_tokens(&["[", "alias=TV", "OR", "size>5g", "]", "is_complete=yes"])
        .expect("valid");
    assert_eq!(from_string.to_string(), from_tokens.to_string());
}

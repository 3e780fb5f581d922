use proptest::prelude::*;
use rt_collections::{StringBuilder, ADOPT_THRESHOLD};

#[derive(Clone, Debug)]
enum Op {
    Append(String),
    AppendChar(char),
    AppendSlice(String, usize, usize),
    AppendMultipleChar(char, usize),
    AppendString(String),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => "\\PC{0,40}".prop_map(Op::Append),
        3 => any::<char>().prop_map(Op::AppendChar),
        2 => ("[a-zé€]{0,30}", any::<prop::sample::Index>(), any::<prop::sample::Index>())
            .prop_map(|(s, a, b)| {
                // Byte offsets on char boundaries, start <= end.
                let bounds: Vec<usize> = s.char_indices().map(|(i, _)| i).chain([s.len()]).collect();
                let (x, y) = (a.get(&bounds).to_owned(), b.get(&bounds).to_owned());
                Op::AppendSlice(s, x.min(y), x.max(y))
            }),
        2 => (any::<char>(), 0usize..300).prop_map(|(c, n)| Op::AppendMultipleChar(c, n)),
        1 => (0usize..3 * ADOPT_THRESHOLD).prop_map(|n| Op::AppendString("z".repeat(n))),
    ]
}

// Property: build() equals the naive concatenation of everything appended,
// len() tracks the running byte count without building, and a second
// build() returns the same text.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_build_matches_concatenation(
        hint in prop_oneof![Just(0usize), 0usize..64, 0usize..5000],
        ops in proptest::collection::vec(arb_op(), 0..60),
    ) {
        let mut b = StringBuilder::new(hint);
        let mut expected = String::new();
        for op in ops {
            match op {
                Op::Append(s) => {
                    b.append(&s).unwrap();
                    expected.push_str(&s);
                }
                Op::AppendChar(c) => {
                    b.append_char(c).unwrap();
                    expected.push(c);
                }
                Op::AppendSlice(s, start, end) => {
                    b.append_slice(&s, start, end).unwrap();
                    expected.push_str(&s[start..end]);
                }
                Op::AppendMultipleChar(c, n) => {
                    b.append_multiple_char(c, n).unwrap();
                    expected.extend(std::iter::repeat(c).take(n));
                }
                Op::AppendString(s) => {
                    expected.push_str(&s);
                    b.append_string(s).unwrap();
                }
            }
            prop_assert_eq!(b.len(), expected.len());
        }
        let first = b.build().to_string();
        prop_assert_eq!(&first, &expected);
        prop_assert_eq!(b.build(), first.as_str());
        prop_assert_eq!(b.len(), expected.len());
    }
}

mod common;

macro_rules! define_serial_test {
    ($test_fn:ident) => {
        #[test]
        fn $test_fn() {
            // no workers, everything runs inside start
            common::$test_fn(Some(0));
        }
    };
}

define_serial_test!(test_two_lobes_split);
define_serial_test!(test_unimodal_is_not_split);
define_serial_test!(test_qualify_only);
define_serial_test!(test_censored_measurements_are_skipped);
define_serial_test!(test_screening_keeps_every_interesting_pair);
define_serial_test!(test_finalists_are_ranked);
define_serial_test!(test_deterministic_matches_synchronous);
define_serial_test!(test_shuffled_deterministic_matches_synchronous);
define_serial_test!(test_pursuer_is_reusable);

// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Property tests for the scoring functions

use biva_evals::scoring::{
    jaccard_similarity, lcs_overlap, lexical_overlap, response_relevance, sentiment_score,
};
use biva_evals::SpanScores;
use proptest::prelude::*;

fn sentence() -> impl Strategy<Value = String> {
    "[a-zA-Z]{1,8}( [a-zA-Z]{1,8}){0,12}"
}

proptest! {
    #[test]
    fn prop_self_match_saturates(s in sentence()) {
        prop_assert_eq!(lexical_overlap(&s, &s), 100.0);
        prop_assert_eq!(lcs_overlap(&s, &s), 100.0);
        prop_assert_eq!(jaccard_similarity(&s, &s), 100.0);
    }

    #[test]
    fn prop_empty_candidate_scores_zero(s in ".*") {
        prop_assert_eq!(lexical_overlap(&s, ""), 0.0);
        prop_assert_eq!(lcs_overlap(&s, ""), 0.0);
    }

    #[test]
    fn prop_scores_stay_in_range(a in ".{0,80}", b in ".{0,80}") {
        for score in [
            lexical_overlap(&a, &b),
            lcs_overlap(&a, &b),
            jaccard_similarity(&a, &b),
            response_relevance(&a, &b),
        ] {
            prop_assert!((0.0..=100.0).contains(&score), "score {} out of range", score);
        }
        let sentiment = sentiment_score(&b);
        prop_assert!((-100.0..=100.0).contains(&sentiment));
    }

    #[test]
    fn prop_sentiment_clamps(positive in 0usize..40, negative in 0usize..40) {
        let text = format!("{}{}", "great ".repeat(positive), "awful ".repeat(negative));
        let expected = ((positive as f64 - negative as f64) * 10.0).clamp(-100.0, 100.0);
        prop_assert_eq!(sentiment_score(&text), expected);
    }

    #[test]
    fn prop_span_scores_are_deterministic(user in ".{0,60}", bot in ".{0,60}") {
        prop_assert_eq!(SpanScores::compute(&user, &bot), SpanScores::compute(&user, &bot));
    }

    #[test]
    fn prop_disjoint_vocabulary_scores_zero(
        a in "[a-m]{1,6}( [a-m]{1,6}){0,5}",
        b in "[n-z]{1,6}( [n-z]{1,6}){0,5}",
    ) {
        prop_assert_eq!(lexical_overlap(&a, &b), 0.0);
        prop_assert_eq!(lcs_overlap(&a, &b), 0.0);
        prop_assert_eq!(jaccard_similarity(&a, &b), 0.0);
    }
}

//! Band-wise constraint elimination.

use crate::constraint::{ActionConstraintContext, ActionSelectorCandidate};
use crate::route::RouteContext;

/// Reduce `candidates` by evaluating their constraints order band by order band.
///
/// The lowest constraint order above `starting_order` forms the next band.
/// Candidates with a constraint in that band must pass every constraint in
/// it (the first rejection ends the check) and are preferred over candidates
/// with no constraint in the band; the latter are only considered when no
/// constrained candidate survives the remaining bands. Without any further
/// band the candidates are returned unchanged.
///
/// Ambiguity is not decided here: more than one candidate may be returned.
pub fn evaluate(
	route_context: &RouteContext,
	candidates: &[ActionSelectorCandidate],
	starting_order: Option<i32>,
) -> Vec<ActionSelectorCandidate> {
	let order = candidates
		.iter()
		.flat_map(|candidate| candidate.constraints.iter())
		.map(|constraint| constraint.order())
		.filter(|order| starting_order.is_none_or(|start| *order > start))
		.min();

	let Some(order) = order else {
		return candidates.to_vec();
	};

	let mut with_constraint = Vec::new();
	let mut without_constraint = Vec::new();

	for candidate in candidates {
		let mut is_match = true;
		let mut found_constraint = false;

		for constraint in candidate
			.constraints
			.iter()
			.filter(|constraint| constraint.order() == order)
		{
			found_constraint = true;
			let context = ActionConstraintContext {
				candidates,
				current_candidate: candidate,
				route_context,
			};
			if !constraint.accept(&context) {
				is_match = false;
				tracing::debug!(
					action = %candidate.action.display_name(),
					constraint = %constraint.name(),
					order,
					"action constraint rejected candidate"
				);
				break;
			}
		}

		if is_match && found_constraint {
			with_constraint.push(candidate.clone());
		} else if is_match {
			without_constraint.push(candidate.clone());
		}
	}

	if !with_constraint.is_empty() {
		let matches = evaluate(route_context, &with_constraint, Some(order));
		if !matches.is_empty() {
			return matches;
		}
	}

	if without_constraint.is_empty() {
		Vec::new()
	} else {
		evaluate(route_context, &without_constraint, Some(order))
	}
}

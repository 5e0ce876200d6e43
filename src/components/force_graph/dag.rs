//! Topological depth layering over graphs that may contain cycles.
//!
//! Depth is the longest run of non-filtered ancestors along any path from a
//! root. Traversal keeps an explicit path stack; meeting a node already on
//! the stack is a cycle, reported once per distinct cycle.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

use super::error::DagError;

/// One end of a link: a raw id, or an already-resolved node.
pub enum Endpoint<'n, N, K> {
	/// Not resolved yet; looked up by id.
	Id(K),
	/// Resolved node.
	Node(&'n N),
}

struct Frame {
	node: usize,
	next_child: usize,
	depth: usize,
}

type LoopHandler<'a, K> = Box<dyn FnMut(&[K]) + 'a>;

/// Depth computation by DFS from every root, with pluggable id extraction.
pub struct DagLayering<'a, N, K> {
	id: Box<dyn Fn(&N) -> K + 'a>,
	node_filter: Box<dyn Fn(&N) -> bool + 'a>,
	on_loop: Option<LoopHandler<'a, K>>,
}

impl<'a, N, K> DagLayering<'a, N, K>
where
	K: Clone + Eq + Hash + Ord + Display,
{
	/// Layering keyed by `id`, with no filter and no loop handler.
	pub fn new(id: impl Fn(&N) -> K + 'a) -> Self {
		Self {
			id: Box::new(id),
			node_filter: Box::new(|_| true),
			on_loop: None,
		}
	}

	/// Nodes failing the filter are still traversed but add no depth and are
	/// left out of the result.
	pub fn node_filter(mut self, filter: impl Fn(&N) -> bool + 'a) -> Self {
		self.node_filter = Box::new(filter);
		self
	}

	/// Called once per distinct cycle with its ids, first id repeated at the
	/// end. Without a handler the first cycle aborts with [`DagError::Cycle`].
	pub fn on_loop(mut self, handler: impl FnMut(&[K]) + 'a) -> Self {
		self.on_loop = Some(Box::new(handler));
		self
	}

	/// Longest-path depth of every node passing the filter.
	pub fn depths<'n, I>(&mut self, nodes: &'n [N], links: I) -> Result<HashMap<K, usize>, DagError>
	where
		I: IntoIterator<Item = (Endpoint<'n, N, K>, Endpoint<'n, N, K>)>,
	{
		let keys: Vec<K> = nodes.iter().map(|n| (self.id)(n)).collect();
		let index: HashMap<&K, usize> = keys.iter().enumerate().map(|(i, k)| (k, i)).collect();
		let skip: Vec<bool> = nodes.iter().map(|n| !(self.node_filter)(n)).collect();

		let resolve = |end: Endpoint<'n, N, K>| -> Result<usize, K> {
			let key = match end {
				Endpoint::Id(k) => k,
				Endpoint::Node(n) => (self.id)(n),
			};
			index.get(&key).copied().ok_or(key)
		};

		let mut out: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
		for (source, target) in links {
			let s = resolve(source).map_err(|k| DagError::MissingSource(k.to_string()))?;
			let t = resolve(target).map_err(|k| DagError::MissingTarget(k.to_string()))?;
			out[s].push(t);
		}

		let mut depth: Vec<Option<usize>> = vec![None; nodes.len()];
		let mut path_pos: Vec<Option<usize>> = vec![None; nodes.len()];
		let mut path: Vec<Frame> = Vec::new();
		let mut seen_loops: HashSet<Vec<usize>> = HashSet::new();

		for root in 0..nodes.len() {
			if depth[root].is_some() {
				continue;
			}
			depth[root] = Some(0);
			path_pos[root] = Some(0);
			path.push(Frame {
				node: root,
				next_child: 0,
				depth: 0,
			});

			while let Some(top) = path.last_mut() {
				let node = top.node;
				let Some(&child) = out[node].get(top.next_child) else {
					path_pos[node] = None;
					path.pop();
					continue;
				};
				top.next_child += 1;
				let child_depth = top.depth + usize::from(!skip[node]);

				if let Some(pos) = path_pos[child] {
					let cycle: Vec<usize> = path[pos..].iter().map(|f| f.node).collect();
					self.report_loop(cycle, &keys, &mut seen_loops)?;
					continue;
				}
				// only revisit when a strictly deeper placement is possible
				if depth[child].is_none_or(|d| child_depth > d) {
					depth[child] = Some(child_depth);
					path_pos[child] = Some(path.len());
					path.push(Frame {
						node: child,
						next_child: 0,
						depth: child_depth,
					});
				}
			}
		}

		Ok(keys
			.into_iter()
			.zip(depth)
			.zip(skip)
			.filter_map(|((key, depth), skip)| match (depth, skip) {
				(Some(d), false) => Some((key, d)),
				_ => None,
			})
			.collect())
	}

	fn report_loop(
		&mut self,
		mut cycle: Vec<usize>,
		keys: &[K],
		seen: &mut HashSet<Vec<usize>>,
	) -> Result<(), DagError> {
		// rotate so the same cycle reads the same from any entry point
		if let Some(start) = (0..cycle.len()).min_by(|&a, &b| keys[cycle[a]].cmp(&keys[cycle[b]])) {
			cycle.rotate_left(start);
		}
		if !seen.insert(cycle.clone()) {
			return Ok(());
		}
		let mut ids: Vec<K> = cycle.iter().map(|&i| keys[i].clone()).collect();
		ids.push(keys[cycle[0]].clone());

		match self.on_loop.as_mut() {
			Some(handler) => {
				handler(&ids);
				Ok(())
			}
			None => Err(DagError::Cycle(ids.iter().map(ToString::to_string).collect())),
		}
	}
}

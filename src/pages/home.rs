use std::rc::Rc;

use leptos::prelude::*;
use log::info;

use crate::components::force_graph::{
	Accessor, Callbacks, ForceGraphCanvas, ForceGraphConfig, ForceGraphHandle, GraphData, GraphLink,
	GraphNode, Link,
};

/// Generate sample graph data (random tree similar to the JS example).
fn generate_sample_data(n: usize) -> GraphData {
	let nodes: Vec<GraphNode> = (0..n)
		.map(|i| {
			let mut node = GraphNode::new(i.to_string()).with_val(1.0 + (i % 4) as f64);
			node.group = Some((i % 10) as u32);
			if i < 10 {
				node.label = Some(format!("Node {}", i));
			}
			node
		})
		.collect();

	let links: Vec<GraphLink> = (1..n)
		.map(|i| {
			let target = (rand_simple(i) * (i as f64)) as usize;
			let mut link = GraphLink::new(i.to_string(), target.to_string());
			link.label = Some(format!("{i} → {target}"));
			link
		})
		.collect();

	GraphData { nodes, links }
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

fn demo_config() -> ForceGraphConfig {
	ForceGraphConfig::default()
		.node_auto_color_by(Accessor::field("group"))
		.link_auto_color_by(Accessor::func(|l: &Link| (l.source % 3).to_string()))
		.link_curvature(0.15)
		.link_directional_arrow_length(3.5)
		.link_directional_arrow_rel_pos(1.0)
		.link_directional_particles(1.0)
}

fn demo_callbacks() -> Callbacks {
	Callbacks {
		on_node_click: Some(Rc::new(|node: &GraphNode| info!("clicked node {}", node.id))),
		on_node_right_click: Some(Rc::new(|node: &GraphNode| info!("right-clicked node {}", node.id))),
		on_engine_stop: Some(Rc::new(|| info!("layout settled"))),
		..Default::default()
	}
}

/// The graph and its toolbar. Kept in its own component so the non-Send
/// callbacks and handle are built inside the error boundary.
#[component]
fn GraphDemo(#[prop(into)] data: Signal<GraphData>) -> impl IntoView {
	let handle = ForceGraphHandle::new();
	let paused = RwSignal::new(false);

	let handle_emit = handle.clone();
	let handle_fit = handle.clone();
	let handle_pause = handle.clone();

	view! {
		<div class="fullscreen-graph">
			<ForceGraphCanvas
				data=data
				config=demo_config()
				callbacks=demo_callbacks()
				handle=handle
				fullscreen=true
			/>
			<div class="graph-overlay">
				<h1>"Force-Directed Graph"</h1>
				<p class="subtitle">"Drag nodes to reposition. Scroll to zoom. Drag background to pan."</p>
				<div class="graph-toolbar">
					<button on:click=move |_| {
						handle_emit.emit_particle(0);
					}>"Emit particle"</button>
					<button on:click=move |_| handle_fit.zoom_to_fit(20.0)>"Zoom to fit"</button>
					<button on:click=move |_| {
						if paused.get_untracked() {
							handle_pause.resume_animation();
						} else {
							handle_pause.pause_animation();
						}
						paused.update(|p| *p = !*p);
					}>{move || if paused.get() { "Resume" } else { "Pause" }}</button>
				</div>
			</div>
		</div>
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	// Create graph data signal
	let graph_data = Signal::derive(move || generate_sample_data(100));

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>
			<GraphDemo data=graph_data />
		</ErrorBoundary>
	}
}

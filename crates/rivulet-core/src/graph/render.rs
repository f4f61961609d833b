//! Block rendering: deferred mutation, memoized pull traversal, offline bounce.

use std::time::Instant;

use super::{Command, Graph};
use crate::buffer::Buffer;
use crate::context::ProcessContext;
use crate::node::{NodeData, NodeId};
use crate::{Error, Result};

impl Graph {
    /// Render one block of `num_frames` frames into the output sink.
    ///
    /// Queued structural changes are applied first. Fails with
    /// [`Error::BlockTooLarge`] if `num_frames` exceeds the configured maximum.
    pub fn render(&mut self, num_frames: usize) -> Result<()> {
        if num_frames > self.max_block_size {
            return Err(Error::BlockTooLarge {
                requested: num_frames,
                max: self.max_block_size,
            });
        }
        let started = Instant::now();

        self.reset_graph();
        self.processed = 0;
        self.render_subgraph(self.output, num_frames);
        for i in 0..self.scheduled.len() {
            let id = self.scheduled[i];
            self.render_subgraph(id, num_frames);
        }

        if let Some(recorder) = self.recorder.as_mut()
            && let Some(sink) = self.nodes.get(self.output)
        {
            recorder.capture(&sink.out, num_frames);
        }
        self.queue_finished_patches();

        let elapsed = started.elapsed().as_secs_f32();
        let block_duration = num_frames as f32 / self.sample_rate;
        let cpu_usage = if block_duration > 0.0 {
            elapsed / block_duration
        } else {
            0.0
        };
        self.stats.publish(self.processed, cpu_usage);
        Ok(())
    }

    /// Render `dest.num_frames()` frames in blocks of `block_size`, copying the
    /// output into `dest`.
    ///
    /// The final block is clipped to the frames remaining. Fails with
    /// [`Error::ChannelCountMismatch`] if `dest` is wider than the output.
    pub fn render_to_buffer(&mut self, dest: &mut Buffer, block_size: usize) -> Result<()> {
        let output_channels = self.output_channels();
        if dest.num_channels() > output_channels {
            return Err(Error::ChannelCountMismatch {
                buffer: dest.num_channels(),
                output: output_channels,
            });
        }
        if block_size == 0 {
            return Err(Error::InvalidConfiguration(
                "block size must be greater than zero".to_string(),
            ));
        }

        let total = dest.num_frames();
        let mut offset = 0;
        while offset < total {
            let n = block_size.min(total - offset);
            self.render(n)?;
            let sink = &self.node(self.output)?.out;
            for channel in 0..dest.num_channels() {
                dest.channel_mut(channel)[offset..offset + n]
                    .copy_from_slice(&sink.channel(channel)[..n]);
            }
            offset += n;
        }
        Ok(())
    }

    /// Apply queued commands and removals, then start a new block.
    ///
    /// Advancing the block stamp clears every node's rendered flag at once.
    fn reset_graph(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply_command(command);
        }

        for i in 0..self.nodes_to_remove.len() {
            let id = self.nodes_to_remove[i];
            self.disconnect_outputs(id);
            self.scheduled.retain(|&n| n != id);
            #[cfg(feature = "tracing")]
            tracing::debug!("graph_stop: {id} disconnected");
        }
        self.nodes_to_remove.clear();

        for i in 0..self.patches_to_remove.len() {
            let patch = self.patches_to_remove[i];
            self.retire_patch(patch);
        }
        self.patches_to_remove.clear();

        self.block += 1;
    }

    fn apply_command(&mut self, command: Command) {
        let result = match command {
            Command::Play(node) => self.play(node),
            Command::Stop(node) => self.stop(node),
            Command::AddNode(node) => self.add_node(node),
            Command::RemoveNode(node) => self.remove_node(node),
            Command::PlayPatch(patch) => self.play_patch(patch),
            Command::StopPatch(patch) => self.stop_patch(patch),
            Command::Trigger { node, name, value } => self.trigger(node, &name, value),
        };
        if let Err(_e) = result {
            #[cfg(feature = "tracing")]
            tracing::debug!("graph_command: dropped ({_e})");
        }
    }

    /// Pull one node: producers first, then the node itself, at most once per
    /// block unless it is a constant.
    fn render_subgraph(&mut self, id: NodeId, num_frames: usize) {
        let (num_inputs, num_variadic) = match self.nodes.get(id) {
            Some(node) if node.rendered_block != self.block => {
                (node.inputs.len(), node.variadic.len())
            }
            _ => return,
        };

        for slot in 0..num_inputs {
            let producer = self.nodes.get(id).and_then(|n| n.inputs[slot]);
            if let Some(p) = producer {
                self.render_subgraph(p, num_frames);
            }
        }
        for i in 0..num_variadic {
            let producer = self.nodes.get(id).and_then(|n| n.variadic.get(i).copied());
            if let Some(p) = producer {
                self.render_subgraph(p, num_frames);
            }
        }

        let Some(mut node) = self.nodes.take(id) else {
            return;
        };
        node.ensure_alloc(self.max_block_size);
        {
            let NodeData {
                processor,
                inputs,
                variadic,
                buffers,
                out,
                layout,
                no_input_upmix,
                ..
            } = &mut node;
            let ctx = ProcessContext {
                sample_rate: self.sample_rate,
                num_frames,
                nodes: &self.nodes,
                slots: processor.inputs(),
                inputs,
                variadic,
                buffers,
                width: layout.inputs,
                upmix: !*no_input_upmix,
                silence: &self.silence,
            };
            processor.process(&ctx, out);
        }
        if !node.constant {
            node.rendered_block = self.block;
            self.processed += 1;
        }
        self.nodes.restore(id, node);
    }
}

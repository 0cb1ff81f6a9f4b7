// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Datagram packing.
//!
//! Lines of each batch are joined with `\n` into packets no larger than
//! the configured maximum. A line is never split; a line that alone
//! exceeds the maximum is sent as its own oversized packet and left to the
//! network to accept or reject.

/// Pack batches of lines into datagram payloads, preserving line order.
pub fn pack_packets(batches: &[Vec<String>], max_packet_size: usize) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();

    for batch in batches {
        let mut lines = batch.iter();
        let Some(first) = lines.next() else {
            continue;
        };
        let mut current = first.as_bytes().to_vec();

        for line in lines {
            if current.len() + 1 + line.len() <= max_packet_size {
                current.push(b'\n');
                current.extend_from_slice(line.as_bytes());
            } else {
                packets.push(std::mem::replace(&mut current, line.as_bytes().to_vec()));
            }
        }
        packets.push(current);
    }

    packets
}

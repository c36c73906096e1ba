// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared tag nodes

use super::records::NodeRecord;

pub const TAG_NODE_LABEL: &str = "Tag";
pub const TAG_TYPE: &str = "tag_type";
pub const DEFAULT_TAG_TYPE: &str = "default";

/// Tags are shared between every entity carrying them, so the key is the
/// tag value itself.
pub fn tag_key(tag: &str) -> String {
    tag.to_string()
}

pub fn tag_node(tag: &str, tag_type: &str) -> NodeRecord {
    NodeRecord::new(TAG_NODE_LABEL, tag_key(tag)).with_attribute(TAG_TYPE, tag_type)
}

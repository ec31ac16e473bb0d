//! `ServiceDescriptorProto` and `MethodDescriptorProto`.

use crate::{
    proto::{
        read_bool, read_message, read_options, read_string, write_nested, write_options,
        RawOptions, SchemaMessage,
    },
    wire::{Parser, Tag, Writer},
    Result,
};

/// `MethodDescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MethodDescriptorProto {
    /// 1: `name`
    pub name: Option<String>,
    /// 2: `input_type`
    pub input_type: Option<String>,
    /// 3: `output_type`
    pub output_type: Option<String>,
    /// 4: `options`
    pub options: Option<RawOptions>,
    /// 5: `client_streaming`
    pub client_streaming: Option<bool>,
    /// 6: `server_streaming`
    pub server_streaming: Option<bool>,
}

impl SchemaMessage for MethodDescriptorProto {
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, _depth: usize) -> Result<bool> {
        match tag.number {
            1 => self.name = Some(read_string(tag, parser)?),
            2 => self.input_type = Some(read_string(tag, parser)?),
            3 => self.output_type = Some(read_string(tag, parser)?),
            4 => read_options(tag, parser, &mut self.options)?,
            5 => self.client_streaming = Some(read_bool(tag, parser)?),
            6 => self.server_streaming = Some(read_bool(tag, parser)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_opt_string(1, self.name.as_deref());
        writer.write_opt_string(2, self.input_type.as_deref());
        writer.write_opt_string(3, self.output_type.as_deref());
        write_options(writer, 4, self.options.as_ref());
        writer.write_opt_bool(5, self.client_streaming);
        writer.write_opt_bool(6, self.server_streaming);
    }
}

/// `ServiceDescriptorProto`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceDescriptorProto {
    /// 1: `name`
    pub name: Option<String>,
    /// 2: `method`
    pub method: Vec<MethodDescriptorProto>,
    /// 3: `options`
    pub options: Option<RawOptions>,
}

impl ServiceDescriptorProto {
    /// The service name, or `""` if absent.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

impl SchemaMessage for ServiceDescriptorProto {
    fn merge_field(&mut self, tag: Tag, parser: &mut Parser<'_>, depth: usize) -> Result<bool> {
        match tag.number {
            1 => self.name = Some(read_string(tag, parser)?),
            2 => self.method.push(read_message(tag, parser, depth)?),
            3 => read_options(tag, parser, &mut self.options)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn encode(&self, writer: &mut Writer) {
        writer.write_opt_string(1, self.name.as_deref());
        for method in &self.method {
            write_nested(writer, 2, method);
        }
        write_options(writer, 3, self.options.as_ref());
    }
}

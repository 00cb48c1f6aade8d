use std::sync::Arc;

use arbitrary::Arbitrary;

use wirebin::record::{
    resolve_keyed, FieldDescriptor, KeyedReader, KeyedRecord, KeyedWriter,
};
use wirebin::{
    Allocator, AllocatorOptions, AnchorPolicy, Converter, DecodeError, EncodeError, Generator,
    GeneratorError, Resolve,
};

/// A keyed record mixing required, optional, constant-width, and variable-width fields. One name is longer than eight bytes, one is a prefix of another.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub struct Sample {
    pub id: u64,
    pub name: String,
    pub name_suffix: Option<String>,
    pub flags: Vec<bool>,
    pub children: Vec<(u8, String)>,
}

impl KeyedRecord for Sample {
    type Fields = (
        Arc<dyn Converter<u64>>,
        Arc<dyn Converter<String>>,
        Arc<dyn Converter<Vec<bool>>>,
        Arc<dyn Converter<Vec<(u8, String)>>>,
    );

    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::required("id"),
        FieldDescriptor::required("name"),
        FieldDescriptor::optional("name_suffix"),
        FieldDescriptor::optional("flags"),
        FieldDescriptor::optional("children_of_this_sample"),
    ];

    fn resolve_fields(generator: &Generator) -> Result<Self::Fields, GeneratorError> {
        Ok((
            generator.get()?,
            generator.get()?,
            generator.get()?,
            generator.get()?,
        ))
    }

    fn encode_fields(
        &self,
        fields: &Self::Fields,
        writer: &mut KeyedWriter<'_>,
    ) -> Result<(), EncodeError> {
        writer.write(0, fields.0.as_ref(), &self.id)?;
        writer.write(1, fields.1.as_ref(), &self.name)?;
        writer.write_optional(2, fields.1.as_ref(), &self.name_suffix)?;
        writer.write(3, fields.2.as_ref(), &self.flags)?;
        writer.write(4, fields.3.as_ref(), &self.children)
    }

    fn decode_fields(fields: &Self::Fields, reader: &KeyedReader<'_>) -> Result<Self, DecodeError> {
        Ok(Sample {
            id: reader.read(0, fields.0.as_ref())?,
            name: reader.read(1, fields.1.as_ref())?,
            name_suffix: reader.read_optional(2, fields.1.as_ref())?,
            flags: reader.read_or_default(3, fields.2.as_ref())?,
            children: reader.read_or_default(4, fields.3.as_ref())?,
        })
    }
}

impl Resolve for Sample {
    fn resolve(generator: &Generator) -> Result<Arc<dyn Converter<Self>>, GeneratorError> {
        resolve_keyed::<Self>(generator)
    }
}

/// One step of driving an [`Allocator`] through nested anchors.
#[derive(Debug, Clone, Arbitrary)]
pub enum AnchorOp {
    Append(Vec<u8>),
    Open,
    Close,
}

/// Replays `ops` on an allocator and on a stack of plain byte vectors, closing whatever is still open at the end, and returns both results.
pub fn replay_anchors(policy: AnchorPolicy, initial_capacity: u8, ops: &[AnchorOp]) -> (Vec<u8>, Vec<u8>) {
    let options = AllocatorOptions::default()
        .with_anchor_policy(policy)
        .with_initial_capacity(initial_capacity as usize);
    let mut allocator = Allocator::with_options(&options);
    let mut anchors = Vec::new();
    let mut model: Vec<Vec<u8>> = vec![Vec::new()];

    let close = |allocator: &mut Allocator, anchor, model: &mut Vec<Vec<u8>>| {
        allocator.finish(anchor).unwrap();
        let body = model.pop().unwrap();
        let parent = model.last_mut().unwrap();
        match policy {
            AnchorPolicy::Reducing => {
                let (prefix, width) = compact_count::encode_to_array(body.len()).unwrap();
                parent.extend_from_slice(&prefix[..width]);
            }
            AnchorPolicy::Pessimistic => {
                let mut prefix = [0; compact_count::LONG_WIDTH];
                compact_count::encode_long_into(body.len(), &mut prefix).unwrap();
                parent.extend_from_slice(&prefix);
            }
        }
        parent.extend_from_slice(&body);
    };

    for op in ops {
        match op {
            AnchorOp::Append(bytes) => {
                allocator.append(bytes).unwrap();
                model.last_mut().unwrap().extend_from_slice(bytes);
            }
            AnchorOp::Open => {
                anchors.push(allocator.anchor().unwrap());
                model.push(Vec::new());
            }
            AnchorOp::Close => {
                if let Some(anchor) = anchors.pop() {
                    close(&mut allocator, anchor, &mut model);
                }
            }
        }
    }

    while let Some(anchor) = anchors.pop() {
        close(&mut allocator, anchor, &mut model);
    }

    let encoded = allocator.into_bytes().unwrap().to_vec();
    (encoded, model.pop().unwrap())
}

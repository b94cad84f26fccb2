//! Curated sample inputs for text skills and the preview engine.

pub const TEXT_SAMPLE: &str =
    "Azure AI Search (formerly known as Azure Cognitive Search) is a cloud search service \
that gives developers infrastructure, APIs, and tools for building a rich search experience over \
private, heterogeneous content in web, mobile, and enterprise applications.

Microsoft Azure was announced in October 2008 and released on February 1, 2010. The platform \
supports many different programming languages, tools, and frameworks, including both Microsoft-specific \
and third-party software and systems.

John Smith, the CEO of Contoso Ltd, announced the partnership on January 15, 2024. He can be reached \
at john.smith@contoso.com or by phone at +1-425-555-0123. The company headquarters is located at \
One Microsoft Way, Redmond, WA 98052, United States.

Azure provides more than 200 products and cloud services designed to help bring new solutions to life. \
The sentiment about cloud adoption has been overwhelmingly positive, with enterprises reporting \
significant cost savings and improved scalability.";

pub const ENGLISH_SAMPLE: &str =
    "Azure AI Search is a powerful cloud-based search service from Microsoft.";

pub const PII_SAMPLE: &str =
    "Customer Record:
Name: Sarah Johnson
Email: sarah.johnson@example.com
Phone: +1-206-555-0198
SSN: 123-45-6789
Credit Card: 4532-1234-5678-9012
Address: 456 Pine Street, Seattle, WA 98101
Date of Birth: March 15, 1985
IP Address: 192.168.1.100
Driver's License: WA-SMITH-123456";

pub const MIXED_SENTIMENT_SAMPLE: &str =
    "The product quality is excellent, but the delivery took much longer than expected.";

pub const ENTITY_SAMPLE: &str =
    "Microsoft Corporation, headquartered in Redmond, Washington, announced today that CEO \
Satya Nadella will present at the upcoming technology conference in San Francisco on December 15, 2024. \
The event will feature demonstrations of Azure AI services and the latest advances in artificial intelligence.

Apple Inc. and Google LLC are also expected to participate. The conference venue, Moscone Center, \
can accommodate 10,000 attendees. Registration fees start at $500 for early bird tickets.";

pub const LONG_TEXT_SAMPLE: &str =
    "Chapter 1: Introduction to Cloud Computing

Cloud computing has revolutionized the way organizations approach their IT infrastructure. \
Instead of maintaining expensive on-premises servers, businesses can now leverage scalable \
resources from cloud providers like Microsoft Azure, Amazon Web Services, and Google Cloud Platform.

Chapter 2: Azure AI Services

Microsoft Azure offers a comprehensive suite of AI services that enable developers to build \
intelligent applications. Azure AI Search provides powerful search capabilities, while Azure \
Cognitive Services offers pre-built AI models for vision, speech, language, and decision-making.

Chapter 3: Building Search Solutions

When building search solutions with Azure AI Search, developers can leverage built-in skills \
to enrich their content. These skills include OCR for extracting text from images, key phrase \
extraction for identifying important terms, and entity recognition for detecting people, places, \
and organizations.

Chapter 4: Best Practices

Effective search solutions require careful planning of the index schema, skillset configuration, \
and query design. Performance optimization and cost management are also critical considerations \
for production deployments.";

/// 400x200 PNG with two lines of black text, for OCR and image analysis runs.
pub const TEXT_IMAGE: &[u8] = include_bytes!("../../assets/sample_text.png");

/// One-page PDF with a heading, a small table and a figure caption.
pub const LAYOUT_DOCUMENT: &[u8] = include_bytes!("../../assets/sample_layout.pdf");

/// Sample image the preview engine pretends to analyse.
pub const INVOICE_IMAGE: &str = "samples/invoice.jpg";
pub const LANDSCAPE_IMAGE: &str = "samples/landscape.jpg";

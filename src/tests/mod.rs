// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod resolver;
